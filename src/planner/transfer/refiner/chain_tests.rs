#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::api::site_dto::{SiteCatalogDto, SiteDto};
    use crate::error::Error;
    use crate::planner::dag::Dag;
    use crate::planner::file_transfer::FileTransfer;
    use crate::planner::job::{Job, JobType};
    use crate::planner::properties::PlannerProperties;
    use crate::planner::site_store::SiteStore;
    use crate::planner::transfer::implementation::GenericTransfer;
    use crate::planner::transfer::refiner::chain::Chain;
    use crate::planner::transfer::refiner::{Refiner, RefinerBag, CHAIN_STAGE_IN_KEY};

    fn bag_with_chain_length(value: &str) -> RefinerBag {
        let mut profiles = HashMap::new();
        profiles.insert(CHAIN_STAGE_IN_KEY.to_string(), value.to_string());
        let site_store = SiteStore::from_dto(SiteCatalogDto {
            sites: vec![SiteDto { handle: "isi".to_string(), profiles }],
        });
        RefinerBag {
            site_store: Arc::new(site_store),
            properties: Arc::new(PlannerProperties::default()),
            stage_in_implementation: Arc::new(GenericTransfer::default()),
            symlink_implementation: Arc::new(GenericTransfer::new(true)),
            inter_site_implementation: Arc::new(GenericTransfer::default()),
            stage_out_implementation: Arc::new(GenericTransfer::default()),
        }
    }

    fn compute_job(name: &str) -> Job {
        Job::new(name, "isi", JobType::Compute)
    }

    fn input(lfn: &str, job_name: &str) -> FileTransfer {
        let mut ft = FileTransfer::new(lfn, job_name);
        ft.add_source("local", format!("gsiftp://local/{}", lfn));
        ft.add_dest("isi", format!("gsiftp://isi/{}", lfn));
        ft
    }

    /// Drives five compute jobs with one unique input file each through
    /// the refiner and returns the transfer job names in creation order.
    fn run_five_jobs(mut refiner: Chain, dag: &mut Dag) -> Vec<String> {
        let mut tx_names = Vec::new();
        for i in 1..=5 {
            let job = compute_job(&format!("c{}", i));
            dag.add_job(job.clone()).unwrap();
            refiner
                .add_stage_in_nodes(dag, &job, vec![input(&format!("f.{}", i), &job.name)], Vec::new())
                .unwrap();
            tx_names.push(format!("stage_in_local_c{}_0", i));
        }
        refiner.done(dag).unwrap();
        tx_names
    }

    #[test]
    fn chain_length_two_builds_two_disjoint_lists() {
        let mut dag = Dag::new();
        let refiner = Chain::new(bag_with_chain_length("2"));
        let tx = run_five_jobs(refiner, &mut dag);

        // slots alternate, so the odd jobs form one chain, the even the other
        assert!(dag.has_edge(&tx[0], &tx[2]));
        assert!(dag.has_edge(&tx[2], &tx[4]));
        assert!(dag.has_edge(&tx[1], &tx[3]));

        assert!(!dag.has_edge(&tx[0], &tx[1]));
        assert!(!dag.has_edge(&tx[1], &tx[2]));
        assert!(!dag.has_edge(&tx[2], &tx[3]));
        assert!(!dag.has_edge(&tx[3], &tx[4]));
        assert!(!dag.has_edge(&tx[0], &tx[4]));
    }

    #[test]
    fn default_chain_length_serializes_a_site() {
        let mut dag = Dag::new();
        let refiner = Chain::new(bag_with_chain_length("1"));
        let tx = run_five_jobs(refiner, &mut dag);

        for window in tx.windows(2) {
            assert!(dag.has_edge(&window[0], &window[1]));
        }
    }

    #[test]
    fn transfer_jobs_still_feed_their_compute_jobs() {
        let mut dag = Dag::new();
        let refiner = Chain::new(bag_with_chain_length("2"));
        let tx = run_five_jobs(refiner, &mut dag);

        for (i, tx_name) in tx.iter().enumerate() {
            assert!(dag.has_edge(tx_name, &format!("c{}", i + 1)));
        }
    }

    #[test]
    fn sites_are_chained_independently() {
        let mut dag = Dag::new();
        let mut refiner = Chain::new(bag_with_chain_length("1"));

        let j1 = compute_job("j1");
        let mut j2 = compute_job("j2");
        j2.site_handle = "nebraska".to_string();
        j2.staging_site_handle = "nebraska".to_string();
        dag.add_job(j1.clone()).unwrap();
        dag.add_job(j2.clone()).unwrap();

        let mut other = FileTransfer::new("f.b", "j2");
        other.add_source("local", "gsiftp://local/f.b");
        other.add_dest("nebraska", "gsiftp://nebraska/f.b");

        refiner.add_stage_in_nodes(&mut dag, &j1, vec![input("f.a", "j1")], Vec::new()).unwrap();
        refiner.add_stage_in_nodes(&mut dag, &j2, vec![other], Vec::new()).unwrap();
        refiner.done(&mut dag).unwrap();

        assert!(!dag.has_edge("stage_in_local_j1_0", "stage_in_local_j2_0"));
    }

    #[test]
    fn invalid_chain_length_is_a_configuration_error() {
        let mut dag = Dag::new();
        let mut refiner = Chain::new(bag_with_chain_length("lots"));
        let j1 = compute_job("j1");
        dag.add_job(j1.clone()).unwrap();

        let result = refiner.add_stage_in_nodes(&mut dag, &j1, vec![input("f.a", "j1")], Vec::new());
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }
}
