use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::{Job, JobType};

/// Bridge to the replica catalog, consumed only for constructing the
/// registration jobs that record materialized files.
pub trait ReplicaCatalogBridge {
    /// Creates the job named `reg_job_name` that registers `files`,
    /// produced by `job`, in the replica catalog.
    fn make_registration_job(&self, reg_job_name: &str, job: &Job, files: &[FileTransfer]) -> Job;
}

/// Default bridge: registration jobs always run on the local site and
/// carry the lfns they register.
#[derive(Debug, Clone, Default)]
pub struct SimpleReplicaCatalogBridge;

impl ReplicaCatalogBridge for SimpleReplicaCatalogBridge {
    fn make_registration_job(&self, reg_job_name: &str, job: &Job, files: &[FileTransfer]) -> Job {
        let mut reg_job = Job::new(reg_job_name, "local", JobType::Registration);
        reg_job.staging_site_handle = job.staging_site_handle.clone();
        reg_job.level = job.level;
        reg_job.lfns = files.iter().map(|ft| ft.lfn.clone()).collect();
        reg_job
    }
}
