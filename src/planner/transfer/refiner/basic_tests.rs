#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::Error;
    use crate::planner::dag::Dag;
    use crate::planner::file_transfer::FileTransfer;
    use crate::planner::job::{Job, JobType};
    use crate::planner::properties::PlannerProperties;
    use crate::planner::site_store::SiteStore;
    use crate::planner::transfer::implementation::GenericTransfer;
    use crate::planner::transfer::refiner::basic::Basic;
    use crate::planner::transfer::refiner::{Refiner, RefinerBag, RefinerType};
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

    fn compute_job(name: &str, site: &str) -> Job {
        Job::new(name, site, JobType::Compute)
    }

    fn input(lfn: &str, job_name: &str) -> FileTransfer {
        let mut ft = FileTransfer::new(lfn, job_name);
        ft.add_source("local", format!("gsiftp://local/{}", lfn));
        ft.add_dest("isi", format!("gsiftp://isi/{}", lfn));
        ft
    }

    #[test]
    fn one_stage_in_job_per_compute_job() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", "isi");
        dag.add_job(j1.clone()).unwrap();

        let mut refiner = Basic::new(bag());
        refiner
            .add_stage_in_nodes(&mut dag, &j1, vec![input("f.a", "j1"), input("f.b", "j1")], Vec::new())
            .unwrap();
        let advisories = refiner.done(&mut dag).unwrap();

        assert!(advisories.is_empty());
        assert!(dag.contains_job("stage_in_local_j1_0"));
        assert!(dag.has_edge("stage_in_local_j1_0", "j1"));
        let lfns = &dag.get_job("stage_in_local_j1_0").unwrap().lfns;
        assert_eq!(lfns, &vec!["f.a".to_string(), "f.b".to_string()]);
    }

    #[test]
    fn shared_inputs_become_edges_not_jobs() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", "isi");
        let j2 = compute_job("j2", "isi");
        dag.add_job(j1.clone()).unwrap();
        dag.add_job(j2.clone()).unwrap();

        let mut refiner = Basic::new(bag());
        refiner
            .add_stage_in_nodes(&mut dag, &j1, vec![input("f.a", "j1")], Vec::new())
            .unwrap();
        refiner
            .add_stage_in_nodes(&mut dag, &j2, vec![input("f.a", "j2"), input("f.c", "j2")], Vec::new())
            .unwrap();
        refiner.done(&mut dag).unwrap();

        // j2's own transfer job only moves what is not already moving
        assert_eq!(dag.get_job("stage_in_local_j2_0").unwrap().lfns, vec!["f.c".to_string()]);
        assert!(dag.has_edge("stage_in_local_j1_0", "j2"));
        assert!(dag.has_edge("stage_in_local_j2_0", "j2"));
    }

    #[test]
    fn executables_are_covered_by_the_fix_up_job() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", "isi");
        let j2 = compute_job("j2", "isi");
        dag.add_job(j1.clone()).unwrap();
        dag.add_job(j2.clone()).unwrap();

        let mut refiner = Basic::new(bag());
        let mut exe = input("keg", "j1");
        exe.executable = true;
        refiner.add_stage_in_nodes(&mut dag, &j1, vec![exe], Vec::new()).unwrap();

        let mut exe = input("keg", "j2");
        exe.executable = true;
        refiner.add_stage_in_nodes(&mut dag, &j2, vec![exe], Vec::new()).unwrap();
        refiner.done(&mut dag).unwrap();

        assert!(dag.contains_job("chmod_j1_0"));
        assert!(!dag.contains_job("chmod_j2_0"));
        assert!(dag.has_edge("stage_in_local_j1_0", "chmod_j1_0"));
        assert!(dag.has_edge("chmod_j1_0", "j1"));
        // the later requester depends on the fix-up job, not the raw copy
        assert!(dag.has_edge("chmod_j1_0", "j2"));
        assert!(!dag.contains_job("stage_in_local_j2_0"));
    }

    #[test]
    fn staged_executables_drop_the_direct_transfer_edge() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", "isi");
        dag.add_job(j1.clone()).unwrap();

        let mut refiner = Basic::new(bag());
        let mut exe = input("keg", "j1");
        exe.executable = true;
        refiner
            .add_stage_in_nodes(&mut dag, &j1, vec![exe, input("f.a", "j1")], Vec::new())
            .unwrap();
        refiner.done(&mut dag).unwrap();

        // the compute job waits on the fix-up job, not on the transfer
        assert!(!dag.has_edge("stage_in_local_j1_0", "j1"));
        assert!(dag.has_edge("stage_in_local_j1_0", "chmod_j1_0"));
        assert!(dag.has_edge("chmod_j1_0", "j1"));
        let lfns = &dag.get_job("stage_in_local_j1_0").unwrap().lfns;
        assert_eq!(lfns, &vec!["keg".to_string(), "f.a".to_string()]);
    }

    #[test]
    fn worker_node_execution_skips_fix_up_jobs() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", "isi");
        dag.add_job(j1.clone()).unwrap();

        let mut properties = PlannerProperties::default();
        properties.worker_node_execution = true;
        let mut bag = bag();
        bag.properties = Arc::new(properties);

        let mut refiner = Basic::new(bag);
        let mut exe = input("keg", "j1");
        exe.executable = true;
        refiner.add_stage_in_nodes(&mut dag, &j1, vec![exe], Vec::new()).unwrap();
        refiner.done(&mut dag).unwrap();

        assert!(!dag.contains_job("chmod_j1_0"));
        assert!(dag.has_edge("stage_in_local_j1_0", "j1"));
    }

    #[test]
    fn stage_out_wires_transfer_then_registration() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", "isi");
        dag.add_job(j1.clone()).unwrap();
        let rcb: Arc<dyn ReplicaCatalogBridge> = Arc::new(SimpleReplicaCatalogBridge);

        let mut refiner = Basic::new(bag());
        let mut out = FileTransfer::new("f.out", "j1");
        out.add_source("isi", "gsiftp://isi/f.out");
        out.add_dest("local", "gsiftp://local/f.out");
        out.register = true;
        refiner
            .add_stage_out_nodes(&mut dag, &j1, vec![out], Arc::clone(&rcb), true, false)
            .unwrap();
        refiner.done(&mut dag).unwrap();

        assert!(dag.has_edge("j1", "stage_out_local_j1_0"));
        assert!(dag.has_edge("stage_out_local_j1_0", "register_j1_0"));
        assert_eq!(dag.get_job("register_j1_0").unwrap().job_type, JobType::Registration);
    }

    #[test]
    fn inter_site_transfers_run_after_the_producer() {
        let mut dag = Dag::new();
        let j1 = compute_job("j1", "siteA");
        let j2 = compute_job("j2", "siteB");
        dag.add_job(j1.clone()).unwrap();
        dag.add_job(j2.clone()).unwrap();

        let mut refiner = Basic::new(bag());
        let mut ft = FileTransfer::new("f.x", "j1");
        ft.add_source("siteA", "gsiftp://siteA/f.x");
        ft.add_dest("siteB", "gsiftp://siteB/f.x");
        refiner.add_inter_site_nodes(&mut dag, &j2, vec![ft], true).unwrap();
        refiner.done(&mut dag).unwrap();

        assert!(dag.contains_job("stage_inter_local_j2_0"));
        assert!(dag.has_edge("j1", "stage_inter_local_j2_0"));
        assert!(dag.has_edge("stage_inter_local_j2_0", "j2"));
    }

    #[test]
    fn refiner_names_resolve_exactly() {
        assert_eq!("Basic".parse::<RefinerType>().unwrap(), RefinerType::Basic);
        assert_eq!(
            "BalancedCluster".parse::<RefinerType>().unwrap(),
            RefinerType::BalancedCluster
        );
        assert!(matches!(
            "balancedcluster".parse::<RefinerType>(),
            Err(Error::UnknownRefiner(_))
        ));
        assert!(matches!("Nope".parse::<RefinerType>(), Err(Error::UnknownRefiner(_))));
    }

    #[test]
    fn factory_builds_every_variant() {
        let dag = Dag::new();
        for name in ["Basic", "Bundle", "Cluster", "BalancedCluster", "Chain", "Condor", "Empty"] {
            let refiner_type = name.parse::<RefinerType>().unwrap();
            let refiner = refiner_type.get_instance(&dag, bag()).unwrap();
            assert!(!refiner.description().is_empty());
        }
    }
}
