//! The simplest refinement strategy: one transfer job per compute job
//! and direction, no clustering. The other strategies reuse its
//! direct-job helpers for the cases they do not cluster.

use std::sync::Arc;

use crate::error::Result;
use crate::planner::dag::Dag;
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::{Job, JobType};
use crate::planner::transfer::implementation::Implementation;
use crate::planner::transfer::refiner::state::RefinementState;
use crate::planner::transfer::refiner::{
    Advisory, Refiner, RefinerBag, INTER_SITE_PREFIX, LOCAL_PREFIX, REGISTER_PREFIX,
    REMOTE_PREFIX, STAGE_IN_PREFIX, STAGE_OUT_PREFIX,
};
use crate::planner::transfer::replica_bridge::ReplicaCatalogBridge;

pub struct Basic {
    bag: RefinerBag,
    state: RefinementState,
}

impl Basic {
    pub fn new(bag: RefinerBag) -> Self {
        Basic { bag, state: RefinementState::new() }
    }
}

impl Refiner for Basic {
    fn add_stage_in_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        symlink_files: Vec<FileTransfer>,
    ) -> Result<()> {
        let stage_in = Arc::clone(&self.bag.stage_in_implementation);
        add_direct_stage_in(dag, &mut self.state, &self.bag, job, files, true, &stage_in)?;
        let symlink = Arc::clone(&self.bag.symlink_implementation);
        add_direct_stage_in(dag, &mut self.state, &self.bag, job, symlink_files, false, &symlink)?;
        Ok(())
    }

    fn add_inter_site_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        local_transfer: bool,
    ) -> Result<()> {
        add_direct_inter_site(dag, &mut self.state, &self.bag, job, files, local_transfer)?;
        Ok(())
    }

    fn add_stage_out_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        rcb: Arc<dyn ReplicaCatalogBridge>,
        local_transfer: bool,
        deleted_leaf: bool,
    ) -> Result<()> {
        add_direct_stage_out(
            dag,
            &mut self.state,
            &self.bag,
            job,
            files,
            rcb,
            local_transfer,
            deleted_leaf,
        )
    }

    fn done(&mut self, dag: &mut Dag) -> Result<Vec<Advisory>> {
        self.state.commit_pending_parents(dag)?;
        self.state.commit_relations(dag)?;
        Ok(self.state.advisories.take())
    }

    fn description(&self) -> &'static str {
        "Transfer jobs are created per compute job without any clustering"
    }
}

fn locality_infix(local_transfer: bool) -> &'static str {
    if local_transfer {
        LOCAL_PREFIX
    } else {
        REMOTE_PREFIX
    }
}

/// Creates one stage-in transfer job for the files of `job` that are not
/// already covered by the dependency table, plus the permission-fix job
/// for staged executables. Returns the name of the transfer job, if one
/// was created.
pub(crate) fn add_direct_stage_in(
    dag: &mut Dag,
    state: &mut RefinementState,
    bag: &RefinerBag,
    job: &Job,
    files: Vec<FileTransfer>,
    local_transfer: bool,
    implementation: &Arc<dyn Implementation>,
) -> Result<Option<String>> {
    if files.is_empty() {
        return Ok(None);
    }

    let priority = job.base_priority()?;
    let site = job.staging_site_handle.clone();
    let prefix = bag.properties.job_prefix.as_deref().unwrap_or("");
    let tx_name = format!(
        "{}{}{}{}_0",
        STAGE_IN_PREFIX,
        locality_infix(local_transfer),
        prefix,
        job.name
    );
    let xbit_needed =
        !bag.properties.worker_node_execution && !implementation.does_preserve_x_bit();

    let mut new_files: Vec<FileTransfer> = Vec::new();
    let mut staged_files: Vec<FileTransfer> = Vec::new();

    for mut ft in files {
        ft.priority = priority;
        let key = RefinementState::file_key(&ft.lfn, &site);

        if let Some(parent) = state.lookup_transfer(&key) {
            // for executables the table already points at the
            // permission-fix job, so one edge covers both concerns
            log::debug!(
                "Not scheduling transfer of {} to {} again, depending on {}",
                ft.lfn,
                site,
                parent
            );
            let parent = parent.to_string();
            state.add_relation(&parent, &job.name);
        } else {
            if ft.executable && xbit_needed {
                staged_files.push(ft.clone());
                // one fix-up job per compute job and flush, so its name
                // index is always 0 and matches the job created below
                state.record_transfer(key, implementation.set_xbit_job_name(&job.name, 0));
            } else {
                state.record_transfer(key, tx_name.clone());
            }
            new_files.push(ft);
        }
    }

    if new_files.is_empty() {
        return Ok(None);
    }

    let run_site = if local_transfer { "local" } else { site.as_str() };
    let staged = if staged_files.is_empty() {
        None
    } else {
        Some(staged_files.as_slice())
    };
    log::debug!("Adding stagein transfer node {}", tx_name);
    let tx_job =
        implementation.create_transfer_job(job, run_site, &new_files, staged, &tx_name, JobType::StageIn);
    dag.add_job(tx_job)?;

    if staged_files.is_empty() {
        state.add_relation(&tx_name, &job.name);
    } else {
        // the compute job depends on the transfer only through the
        // fix-up job
        let xbit_job = implementation.create_set_xbit_job(job, &staged_files, JobType::StageIn, 0);
        let xbit_name = xbit_job.name.clone();
        dag.add_job(xbit_job)?;
        state.add_relation(&tx_name, &xbit_name);
        state.add_relation(&xbit_name, &job.name);
    }

    Ok(Some(tx_name))
}

/// Creates one inter-site transfer job pulling a parent job's outputs to
/// `job`'s staging site, honoring the dependency table. Returns the name
/// of the transfer job, if one was created.
pub(crate) fn add_direct_inter_site(
    dag: &mut Dag,
    state: &mut RefinementState,
    bag: &RefinerBag,
    job: &Job,
    files: Vec<FileTransfer>,
    local_transfer: bool,
) -> Result<Option<String>> {
    if files.is_empty() {
        return Ok(None);
    }

    let priority = job.base_priority()?;
    let site = job.staging_site_handle.clone();
    let prefix = bag.properties.job_prefix.as_deref().unwrap_or("");
    let tx_name = format!(
        "{}{}{}{}_0",
        INTER_SITE_PREFIX,
        locality_infix(local_transfer),
        prefix,
        job.name
    );

    let mut new_files: Vec<FileTransfer> = Vec::new();
    let mut producers: Vec<String> = Vec::new();

    for mut ft in files {
        ft.priority = priority;
        let key = RefinementState::file_key(&ft.lfn, &site);

        if let Some(parent) = state.lookup_transfer(&key) {
            log::debug!(
                "Not scheduling transfer of {} to {} again, depending on {}",
                ft.lfn,
                site,
                parent
            );
            let parent = parent.to_string();
            state.add_relation(&parent, &job.name);
        } else {
            state.record_transfer(key, tx_name.clone());
            // the producing job has to finish before its outputs move on
            producers.push(ft.job_name.clone());
            new_files.push(ft);
        }
    }

    if new_files.is_empty() {
        return Ok(None);
    }

    let run_site = if local_transfer { "local" } else { site.as_str() };
    log::debug!("Adding inter-site transfer node {}", tx_name);
    let tx_job = bag.inter_site_implementation.create_transfer_job(
        job,
        run_site,
        &new_files,
        None,
        &tx_name,
        JobType::InterSite,
    );
    dag.add_job(tx_job)?;
    for producer in producers {
        state.add_relation(&producer, &tx_name);
    }
    state.add_relation(&tx_name, &job.name);

    Ok(Some(tx_name))
}

/// Creates the stage-out and registration jobs for `job`'s outputs.
/// Files can need physical movement, registration, both, or neither.
#[allow(clippy::too_many_arguments)]
pub(crate) fn add_direct_stage_out(
    dag: &mut Dag,
    state: &mut RefinementState,
    bag: &RefinerBag,
    job: &Job,
    files: Vec<FileTransfer>,
    rcb: Arc<dyn ReplicaCatalogBridge>,
    local_transfer: bool,
    deleted_leaf: bool,
) -> Result<()> {
    if files.is_empty() {
        return Ok(());
    }

    let priority = job.base_priority()?;
    let prefix = bag.properties.job_prefix.as_deref().unwrap_or("");
    let tx_name = format!(
        "{}{}{}{}_0",
        STAGE_OUT_PREFIX,
        locality_infix(local_transfer),
        prefix,
        job.name
    );
    let reg_name = format!("{}{}{}_0", REGISTER_PREFIX, prefix, job.name);

    let mut tx_files: Vec<FileTransfer> = Vec::new();
    let mut reg_files: Vec<FileTransfer> = Vec::new();

    for mut ft in files {
        ft.priority = priority;
        if bag.properties.create_registration_jobs && ft.register {
            reg_files.push(ft.clone());
        }
        if !ft.transient_transfer {
            tx_files.push(ft);
        }
    }

    let mut created_tx = false;
    if !tx_files.is_empty() {
        let run_site = if local_transfer { "local" } else { job.staging_site_handle.as_str() };
        log::debug!("Adding stage-out job {}", tx_name);
        let tx_job = bag.stage_out_implementation.create_transfer_job(
            job,
            run_site,
            &tx_files,
            None,
            &tx_name,
            JobType::StageOut,
        );
        dag.add_job(tx_job)?;
        created_tx = true;
        if !deleted_leaf {
            state.add_relation(&job.name, &tx_name);
        }
    }

    if !reg_files.is_empty() {
        log::debug!("Adding registration job {}", reg_name);
        let reg_job = rcb.make_registration_job(&reg_name, job, &reg_files);
        dag.add_job(reg_job)?;
        if created_tx {
            state.add_relation(&tx_name, &reg_name);
        } else if !deleted_leaf {
            state.add_relation(&job.name, &reg_name);
        }
    }

    Ok(())
}
