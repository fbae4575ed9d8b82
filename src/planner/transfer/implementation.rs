use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::{Job, JobType};

/// Builder for the physical transfer jobs a refinement strategy inserts
/// into the graph. The refiners only decide *which* jobs exist and how
/// they are wired; how a transfer job invokes its executable is the
/// implementation's concern.
pub trait Implementation {
    /// Creates a transfer job named `job_name` that moves `files`,
    /// running at `run_site`. `template` is the compute job the transfer
    /// is associated with; site and level metadata are taken from it.
    /// `staged_executables` lists the subset of files that are staged
    /// executables, if any.
    fn create_transfer_job(
        &self,
        template: &Job,
        run_site: &str,
        files: &[FileTransfer],
        staged_executables: Option<&[FileTransfer]>,
        job_name: &str,
        job_type: JobType,
    ) -> Job;

    /// Creates the job that restores the execute bit on staged
    /// executables for `compute_job`.
    fn create_set_xbit_job(
        &self,
        compute_job: &Job,
        files: &[FileTransfer],
        job_type: JobType,
        index: usize,
    ) -> Job;

    /// The name of the permission-fix job for `job_name`, deterministic
    /// so the dependency table can point at it before it is created.
    fn set_xbit_job_name(&self, job_name: &str, index: usize) -> String;

    /// Whether transfers done by this implementation keep the execute
    /// bit intact, making permission-fix jobs unnecessary.
    fn does_preserve_x_bit(&self) -> bool;
}

/// The default transfer-job builder: one job per container invoking the
/// generic transfer tool with the accumulated file list.
#[derive(Debug, Clone)]
pub struct GenericTransfer {
    preserve_x_bit: bool,
}

impl GenericTransfer {
    pub fn new(preserve_x_bit: bool) -> Self {
        GenericTransfer { preserve_x_bit }
    }
}

impl Default for GenericTransfer {
    fn default() -> Self {
        GenericTransfer::new(false)
    }
}

impl Implementation for GenericTransfer {
    fn create_transfer_job(
        &self,
        template: &Job,
        run_site: &str,
        files: &[FileTransfer],
        _staged_executables: Option<&[FileTransfer]>,
        job_name: &str,
        job_type: JobType,
    ) -> Job {
        let mut job = Job::new(job_name, run_site, job_type);
        job.staging_site_handle = template.staging_site_handle.clone();
        job.level = template.level;
        job.priority = files.first().map_or(0, |ft| ft.priority);
        job.lfns = files.iter().map(|ft| ft.lfn.clone()).collect();
        job
    }

    fn create_set_xbit_job(
        &self,
        compute_job: &Job,
        files: &[FileTransfer],
        _job_type: JobType,
        index: usize,
    ) -> Job {
        let name = self.set_xbit_job_name(&compute_job.name, index);
        let mut job = Job::new(name, compute_job.staging_site_handle.clone(), JobType::SetXBit);
        job.level = compute_job.level;
        job.lfns = files.iter().map(|ft| ft.lfn.clone()).collect();
        job
    }

    fn set_xbit_job_name(&self, job_name: &str, index: usize) -> String {
        format!("chmod_{}_{}", job_name, index)
    }

    fn does_preserve_x_bit(&self) -> bool {
        self.preserve_x_bit
    }
}
