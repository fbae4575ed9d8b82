//! Passthrough refinement for pure-Condor setups: no stage-in jobs are
//! created at all. Input files must already be reachable as local file
//! URLs and are handed to the scheduler's own file transfer mechanism
//! on the compute job itself.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::planner::dag::Dag;
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::{Job, JobType};
use crate::planner::transfer::refiner::state::RefinementState;
use crate::planner::transfer::refiner::{
    Advisory, Refiner, RefinerBag, LOCAL_PREFIX, REMOTE_PREFIX, STAGE_OUT_PREFIX,
};
use crate::planner::transfer::replica_bridge::ReplicaCatalogBridge;

const FILE_URL_PREFIX: &str = "file://";

pub struct Condor {
    bag: RefinerBag,
    state: RefinementState,
}

impl Condor {
    pub fn new(bag: RefinerBag) -> Self {
        Condor { bag, state: RefinementState::new() }
    }

    /// Adds the local paths behind `files` to the compute job's own
    /// transfer list. A source that is not a file URL cannot be handed
    /// to the scheduler and aborts the run.
    fn attach_input_files(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
    ) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        let mut paths = Vec::new();
        for ft in &files {
            let source = ft.source_url().ok_or_else(|| {
                Error::MalformedUrl(format!("No source location for file {}", ft.lfn))
            })?;
            let path = source.url.strip_prefix(FILE_URL_PREFIX).ok_or_else(|| {
                Error::MalformedUrl(format!(
                    "Source {} for file {} is not a file URL",
                    source.url, ft.lfn
                ))
            })?;
            paths.push(path.to_string());
        }

        let compute_job = dag.get_job_mut(&job.name).ok_or_else(|| {
            Error::InvariantViolation(format!("Compute job {} not present in workflow", job.name))
        })?;
        for path in paths {
            if !compute_job.transfer_input_files.contains(&path) {
                log::debug!("Attaching input file {} to job {}", path, job.name);
                compute_job.transfer_input_files.push(path);
            }
        }
        Ok(())
    }
}

impl Refiner for Condor {
    fn add_stage_in_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        symlink_files: Vec<FileTransfer>,
    ) -> Result<()> {
        self.attach_input_files(dag, job, files)?;
        self.attach_input_files(dag, job, symlink_files)
    }

    fn add_inter_site_nodes(
        &mut self,
        _dag: &mut Dag,
        _job: &Job,
        _files: Vec<FileTransfer>,
        _local_transfer: bool,
    ) -> Result<()> {
        Err(Error::UnsupportedOperation {
            refiner: "Condor",
            operation: "inter-site transfers",
        })
    }

    fn add_stage_out_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        _rcb: Arc<dyn ReplicaCatalogBridge>,
        local_transfer: bool,
        deleted_leaf: bool,
    ) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        let priority = job.base_priority()?;
        let mut tx_files = Vec::new();
        for mut ft in files {
            ft.priority = priority;
            if ft.register {
                log::warn!(
                    "Replica registration is not supported by the Condor refiner, skipping {}",
                    ft.lfn
                );
            }
            if !ft.transient_transfer {
                tx_files.push(ft);
            }
        }
        if tx_files.is_empty() {
            return Ok(());
        }

        let locality = if local_transfer { LOCAL_PREFIX } else { REMOTE_PREFIX };
        let prefix = self.bag.properties.job_prefix.as_deref().unwrap_or("");
        let tx_name = format!("{}{}{}{}_0", STAGE_OUT_PREFIX, locality, prefix, job.name);
        let run_site = if local_transfer { "local" } else { job.staging_site_handle.as_str() };

        log::debug!("Adding stage-out job {}", tx_name);
        let tx_job = self.bag.stage_out_implementation.create_transfer_job(
            job,
            run_site,
            &tx_files,
            None,
            &tx_name,
            JobType::StageOut,
        );
        dag.add_job(tx_job)?;
        if !deleted_leaf {
            self.state.add_relation(&job.name, &tx_name);
        }
        Ok(())
    }

    fn done(&mut self, dag: &mut Dag) -> Result<Vec<Advisory>> {
        self.state.commit_pending_parents(dag)?;
        self.state.commit_relations(dag)?;
        Ok(self.state.advisories.take())
    }

    fn description(&self) -> &'static str {
        "Input files are handed to the scheduler's own file transfer mechanism"
    }
}
