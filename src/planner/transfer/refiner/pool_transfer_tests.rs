#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::planner::file_transfer::FileTransfer;
    use crate::planner::job::JobType;
    use crate::planner::transfer::refiner::pool_transfer::PoolTransfer;

    fn file(lfn: &str) -> FileTransfer {
        FileTransfer::new(lfn, "job")
    }

    #[test]
    fn distributes_files_round_robin() {
        let mut pool = PoolTransfer::new("isi", true, 3, None);
        for i in 0..7 {
            pool.add_transfer(vec![file(&format!("f.{}", i))], Some(0), JobType::StageIn)
                .unwrap();
        }
        let counts: Vec<usize> = pool.containers().map(|c| c.file_transfers().len()).collect();
        assert_eq!(counts, vec![3, 2, 2]);
    }

    #[test]
    fn names_carry_direction_locality_site_level_and_slot() {
        let mut pool = PoolTransfer::new("isi", true, 2, None);
        let container = pool.add_transfer(vec![file("f.a")], Some(4), JobType::StageIn).unwrap();
        assert_eq!(container.tx_name(), "stage_in_local_isi_4_0");
        assert_eq!(container.reg_name(), "register_isi_4_0");

        let mut pool = PoolTransfer::new("isi", false, 2, None);
        let container = pool.add_transfer(vec![file("f.b")], Some(4), JobType::StageOut).unwrap();
        assert_eq!(container.tx_name(), "stage_out_remote_isi_4_0");
    }

    #[test]
    fn whole_workflow_names_omit_the_level() {
        let mut pool = PoolTransfer::new("isi", false, 1, None);
        let container = pool.add_transfer(vec![file("f.a")], None, JobType::StageIn).unwrap();
        assert_eq!(container.tx_name(), "stage_in_remote_isi_0");
        assert_eq!(container.reg_name(), "register_isi_0");
    }

    #[test]
    fn job_prefix_lands_in_the_names() {
        let mut pool = PoolTransfer::new("isi", true, 1, Some("blackdiamond_".to_string()));
        let container = pool.add_transfer(vec![file("f.a")], Some(0), JobType::StageOut).unwrap();
        assert_eq!(container.tx_name(), "stage_out_local_blackdiamond_isi_0_0");
        assert_eq!(container.reg_name(), "register_blackdiamond_isi_0_0");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let pool = PoolTransfer::new("isi", true, 0, None);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn only_used_slots_become_containers() {
        let mut pool = PoolTransfer::new("isi", true, 4, None);
        pool.add_transfer(vec![file("f.a")], Some(0), JobType::StageIn).unwrap();
        pool.add_transfer(vec![file("f.b")], Some(0), JobType::StageIn).unwrap();
        assert_eq!(pool.into_containers().len(), 2);
    }

    #[test]
    fn cursor_wraps_back_to_the_first_slot() {
        let mut pool = PoolTransfer::new("isi", true, 2, None);
        let first = pool
            .add_transfer(vec![file("f.a")], Some(1), JobType::StageIn)
            .unwrap()
            .tx_name()
            .to_string();
        pool.add_transfer(vec![file("f.b")], Some(1), JobType::StageIn).unwrap();
        let third = pool.add_transfer(vec![file("f.c")], Some(1), JobType::StageIn).unwrap();
        assert_eq!(third.tx_name(), first);
        assert_eq!(third.file_transfers().len(), 2);
    }

    #[test]
    fn rejects_non_transfer_job_types() {
        let mut pool = PoolTransfer::new("isi", true, 1, None);
        let result = pool.add_transfer(vec![file("f.a")], Some(0), JobType::Compute);
        assert!(matches!(result, Err(Error::InvariantViolation(_))));
    }
}
