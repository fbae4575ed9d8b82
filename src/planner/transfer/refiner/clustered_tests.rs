#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::Error;
    use crate::planner::dag::Dag;
    use crate::planner::file_transfer::FileTransfer;
    use crate::planner::job::{Job, JobType};
    use crate::planner::properties::PlannerProperties;
    use crate::planner::site_store::SiteStore;
    use crate::planner::transfer::implementation::{GenericTransfer, Implementation};
    use crate::planner::transfer::refiner::cluster::Cluster;
    use crate::planner::transfer::refiner::cluster_value::ClusterValue;
    use crate::planner::transfer::refiner::clustered::{
        add_clustered_stage_in, add_clustered_stage_out, flush_stage_in_map, flush_stage_out_map,
        SiteMap,
    };
    use crate::planner::transfer::refiner::state::RefinementState;
    use crate::planner::transfer::refiner::{
        Refiner, RefinerBag, CLUSTER_LOCAL_STAGE_IN_KEY, CLUSTER_STAGE_IN_KEY,
    };
    use crate::planner::transfer::replica_bridge::{
        ReplicaCatalogBridge, SimpleReplicaCatalogBridge,
    };

    fn bag() -> RefinerBag {
        RefinerBag {
            site_store: Arc::new(SiteStore::new()),
            properties: Arc::new(PlannerProperties::default()),
            stage_in_implementation: Arc::new(GenericTransfer::default()),
            symlink_implementation: Arc::new(GenericTransfer::new(true)),
            inter_site_implementation: Arc::new(GenericTransfer::default()),
            stage_out_implementation: Arc::new(GenericTransfer::default()),
        }
    }

    fn compute_job(name: &str, level: i32) -> Job {
        let mut job = Job::new(name, "isi", JobType::Compute);
        job.level = level;
        job
    }

    fn input(lfn: &str, job_name: &str) -> FileTransfer {
        let mut ft = FileTransfer::new(lfn, job_name);
        ft.add_source("local", format!("gsiftp://local/{}", lfn));
        ft.add_dest("isi", format!("gsiftp://isi/{}", lfn));
        ft
    }

    fn output(lfn: &str, job_name: &str) -> FileTransfer {
        let mut ft = FileTransfer::new(lfn, job_name);
        ft.add_source("isi", format!("gsiftp://isi/{}", lfn));
        ft.add_dest("local", format!("gsiftp://local/{}", lfn));
        ft
    }

    fn stage_in_value(bag: &RefinerBag, state: &mut RefinementState) -> ClusterValue {
        ClusterValue::initialize(
            CLUSTER_LOCAL_STAGE_IN_KEY,
            CLUSTER_STAGE_IN_KEY,
            Some(2),
            &bag.properties,
            false,
            &mut state.advisories,
        )
        .unwrap()
    }

    #[test]
    fn duplicate_transfers_are_suppressed() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", 0);
        let j2 = compute_job("j2", 0);
        dag.add_job(j1.clone()).unwrap();
        dag.add_job(j2.clone()).unwrap();

        let bag = bag();
        let mut state = RefinementState::new();
        let value = stage_in_value(&bag, &mut state);
        let implementation: Arc<dyn Implementation> = Arc::new(GenericTransfer::default());
        let mut map = SiteMap::new();

        add_clustered_stage_in(
            &mut dag,
            &mut state,
            &mut map,
            &value,
            &bag,
            &implementation,
            &j1,
            vec![input("f.a", "j1")],
            true,
            Some(0),
            2,
        )
        .unwrap();
        add_clustered_stage_in(
            &mut dag,
            &mut state,
            &mut map,
            &value,
            &bag,
            &implementation,
            &j2,
            vec![input("f.a", "j2")],
            true,
            Some(0),
            2,
        )
        .unwrap();

        let tx_jobs = flush_stage_in_map(&mut dag, map, &implementation, true, Some(0)).unwrap();
        state.commit_pending_parents(&mut dag).unwrap();

        assert_eq!(tx_jobs.len(), 1);
        assert_eq!(dag.size(), 3);
        assert!(dag.has_edge(&tx_jobs[0], "j1"));
        assert!(dag.has_edge(&tx_jobs[0], "j2"));
        assert_eq!(dag.edge_count(), 2);
    }

    #[test]
    fn duplicate_input_files_of_one_job_move_once() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", 0);
        dag.add_job(j1.clone()).unwrap();

        let bag = bag();
        let mut state = RefinementState::new();
        let value = stage_in_value(&bag, &mut state);
        let implementation: Arc<dyn Implementation> = Arc::new(GenericTransfer::default());
        let mut map = SiteMap::new();

        add_clustered_stage_in(
            &mut dag,
            &mut state,
            &mut map,
            &value,
            &bag,
            &implementation,
            &j1,
            vec![input("f.a", "j1"), input("f.a", "j1")],
            true,
            Some(0),
            2,
        )
        .unwrap();

        let tx_jobs = flush_stage_in_map(&mut dag, map, &implementation, true, Some(0)).unwrap();
        state.commit_pending_parents(&mut dag).unwrap();

        assert_eq!(tx_jobs.len(), 1);
        assert_eq!(dag.get_job(&tx_jobs[0]).unwrap().lfns, vec!["f.a".to_string()]);
        assert_eq!(dag.edge_count(), 1);
    }

    #[test]
    fn staged_executables_get_one_permission_fix_job() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", 0);
        let j2 = compute_job("j2", 0);
        dag.add_job(j1.clone()).unwrap();
        dag.add_job(j2.clone()).unwrap();

        let bag = bag();
        let mut state = RefinementState::new();
        let value = stage_in_value(&bag, &mut state);
        let implementation: Arc<dyn Implementation> = Arc::new(GenericTransfer::default());
        let mut map = SiteMap::new();

        let mut exe = input("keg", "j1");
        exe.executable = true;
        add_clustered_stage_in(
            &mut dag,
            &mut state,
            &mut map,
            &value,
            &bag,
            &implementation,
            &j1,
            vec![exe],
            true,
            Some(0),
            2,
        )
        .unwrap();

        // second requester depends on the fix-up job, no second chmod
        let mut exe = input("keg", "j2");
        exe.executable = true;
        add_clustered_stage_in(
            &mut dag,
            &mut state,
            &mut map,
            &value,
            &bag,
            &implementation,
            &j2,
            vec![exe],
            true,
            Some(0),
            2,
        )
        .unwrap();

        let tx_jobs = flush_stage_in_map(&mut dag, map, &implementation, true, Some(0)).unwrap();
        state.commit_pending_parents(&mut dag).unwrap();
        state.commit_relations(&mut dag).unwrap();

        assert_eq!(tx_jobs.len(), 1);
        assert!(dag.contains_job("chmod_j1_0"));
        assert!(!dag.contains_job("chmod_j2_0"));
        assert!(dag.has_edge(&tx_jobs[0], "chmod_j1_0"));
        assert!(dag.has_edge("chmod_j1_0", "j1"));
        assert!(dag.has_edge("chmod_j1_0", "j2"));
    }

    #[test]
    fn stage_out_splits_transfer_and_registration() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", 2);
        dag.add_job(j1.clone()).unwrap();

        let mut state = RefinementState::new();
        let implementation: Arc<dyn Implementation> = Arc::new(GenericTransfer::default());
        let rcb: Arc<dyn ReplicaCatalogBridge> = Arc::new(SimpleReplicaCatalogBridge);
        let mut map = SiteMap::new();

        let mut registered = output("f.out", "j1");
        registered.register = true;
        let mut transient = output("f.tmp", "j1");
        transient.transient_transfer = true;

        add_clustered_stage_out(
            &mut state,
            &mut map,
            &j1,
            vec![registered, transient],
            true,
            2,
            2,
            true,
            None,
            false,
        )
        .unwrap();

        let tx_jobs =
            flush_stage_out_map(&mut dag, &mut state, map, &implementation, Some(&rcb), true, Some(2))
                .unwrap();
        state.commit_relations(&mut dag).unwrap();

        assert_eq!(tx_jobs.len(), 1);
        let so_name = "stage_out_local_isi_2_0";
        let reg_name = "register_isi_2_0";
        assert!(dag.contains_job(so_name));
        assert!(dag.contains_job(reg_name));
        assert_eq!(dag.get_job(reg_name).unwrap().job_type, JobType::Registration);
        assert!(dag.has_edge("j1", so_name));
        assert!(dag.has_edge(so_name, reg_name));
        // the transient file produced neither a transfer nor an edge
        assert_eq!(dag.get_job(so_name).unwrap().lfns, vec!["f.out".to_string()]);
    }

    #[test]
    fn registration_without_a_bridge_is_fatal() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", 0);
        dag.add_job(j1.clone()).unwrap();

        let mut state = RefinementState::new();
        let implementation: Arc<dyn Implementation> = Arc::new(GenericTransfer::default());
        let mut map = SiteMap::new();

        let mut registered = output("f.out", "j1");
        registered.register = true;
        add_clustered_stage_out(&mut state, &mut map, &j1, vec![registered], true, 1, 0, true, None, false)
            .unwrap();

        let result =
            flush_stage_out_map(&mut dag, &mut state, map, &implementation, None, true, Some(0));
        assert!(matches!(result, Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn deleted_leaf_suppresses_the_compute_edge() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", 0);
        dag.add_job(j1.clone()).unwrap();

        let mut state = RefinementState::new();
        let implementation: Arc<dyn Implementation> = Arc::new(GenericTransfer::default());
        let rcb: Arc<dyn ReplicaCatalogBridge> = Arc::new(SimpleReplicaCatalogBridge);
        let mut map = SiteMap::new();

        add_clustered_stage_out(
            &mut state,
            &mut map,
            &j1,
            vec![output("f.out", "j1")],
            true,
            1,
            0,
            true,
            None,
            true,
        )
        .unwrap();
        let tx_jobs =
            flush_stage_out_map(&mut dag, &mut state, map, &implementation, Some(&rcb), true, Some(0))
                .unwrap();
        state.commit_relations(&mut dag).unwrap();

        assert_eq!(tx_jobs.len(), 1);
        assert!(!dag.has_edge("j1", &tx_jobs[0]));
    }

    #[test]
    fn level_change_flushes_the_open_containers() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", 0);
        let j2 = compute_job("j2", 1);
        dag.add_job(j1.clone()).unwrap();
        dag.add_job(j2.clone()).unwrap();
        dag.add_edge("j1", "j2").unwrap();

        let mut refiner = Cluster::new(&dag, bag()).unwrap();
        refiner
            .add_stage_in_nodes(&mut dag, &j1, vec![input("f.a", "j1")], Vec::new())
            .unwrap();
        assert!(!dag.contains_job("stage_in_local_isi_0_0"));

        // the first job of the next level materializes level 0
        refiner
            .add_stage_in_nodes(&mut dag, &j2, vec![input("f.b", "j2")], Vec::new())
            .unwrap();
        assert!(dag.contains_job("stage_in_local_isi_0_0"));
        assert!(!dag.contains_job("stage_in_local_isi_1_0"));

        refiner.done(&mut dag).unwrap();
        assert!(dag.contains_job("stage_in_local_isi_1_0"));
        assert!(dag.has_edge("stage_in_local_isi_0_0", "j1"));
        assert!(dag.has_edge("stage_in_local_isi_1_0", "j2"));
        // level isolation: each transfer job carries only its level's file
        assert_eq!(dag.get_job("stage_in_local_isi_0_0").unwrap().lfns, vec!["f.a".to_string()]);
        assert_eq!(dag.get_job("stage_in_local_isi_1_0").unwrap().lfns, vec!["f.b".to_string()]);
    }
}
