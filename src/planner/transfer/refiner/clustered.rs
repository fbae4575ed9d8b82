//! Helpers shared by the bundling/clustering refiners: scheduling files
//! into per-site round-robin pools, and flushing those pools into
//! concrete transfer, permission-fix and registration jobs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::planner::dag::Dag;
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::{Job, JobType};
use crate::planner::transfer::implementation::Implementation;
use crate::planner::transfer::refiner::cluster_value::ClusterValue;
use crate::planner::transfer::refiner::pool_transfer::PoolTransfer;
use crate::planner::transfer::refiner::state::RefinementState;
use crate::planner::transfer::refiner::RefinerBag;
use crate::planner::transfer::replica_bridge::ReplicaCatalogBridge;

/// Per-direction transfer pools, indexed by staging site. Ordered so
/// flushes create jobs in a reproducible site order.
pub type SiteMap = BTreeMap<String, PoolTransfer>;

/// A blank job carrying only the site/level metadata the transfer-job
/// builder reads off its template.
fn template_job(site: &str, level: i32) -> Job {
    let mut job = Job::new(String::new(), site, JobType::Compute);
    job.level = level;
    job
}

/// Schedules the stage-in `files` of `job` into the per-site pool map,
/// honoring the dependency table and collecting staged executables into
/// one permission-fix job per compute job.
///
/// `level_in_name` carries the workflow level into the generated job
/// names for the per-level strategies and is `None` for whole-workflow
/// bundling. `fallback` is the capacity used when neither the site
/// catalog nor the properties configure one.
#[allow(clippy::too_many_arguments)]
pub fn add_clustered_stage_in(
    dag: &mut Dag,
    state: &mut RefinementState,
    map: &mut SiteMap,
    bundle_value: &ClusterValue,
    bag: &RefinerBag,
    implementation: &Arc<dyn Implementation>,
    job: &Job,
    files: Vec<FileTransfer>,
    local_transfer: bool,
    level_in_name: Option<i32>,
    fallback: usize,
) -> Result<()> {
    let job_name = job.name.clone();
    let site = job.staging_site_handle.clone();
    let priority = job.base_priority()?;
    let xbit_needed =
        !bag.properties.worker_node_execution && !implementation.does_preserve_x_bit();

    // parents discovered for this job in this call; deduplicated and
    // committed as edges at the next flush
    let mut temp_set: BTreeSet<String> = BTreeSet::new();
    let mut staged_files: Vec<FileTransfer> = Vec::new();
    let mut stage_in_exec_jobs: Vec<String> = Vec::new();

    for mut ft in files {
        ft.priority = priority;
        let key = RefinementState::file_key(&ft.lfn, &site);

        if let Some(parent) = state.lookup_transfer(&key) {
            // transfer of this file has already been scheduled onto the
            // site; depend on the existing job instead
            let parent = parent.to_string();
            log::debug!(
                "Not scheduling transfer of {} to {} again, depending on {}",
                ft.lfn,
                site,
                parent
            );
            temp_set.insert(parent);

            if ft.executable && xbit_needed {
                let xbit_job = state.lookup_setup_job(&key).ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "No permission-fix job recorded for staged executable {}",
                        key
                    ))
                })?;
                let xbit_job = xbit_job.to_string();
                state.add_relation(&xbit_job, &job_name);
            }
        } else {
            if !map.contains_key(&site) {
                let capacity =
                    bundle_value.determine(&bag.site_store, job, fallback, &mut state.advisories)?;
                map.insert(
                    site.clone(),
                    PoolTransfer::new(
                        site.clone(),
                        local_transfer,
                        capacity,
                        bag.properties.job_prefix.clone(),
                    ),
                );
            }
            let pool = map.get_mut(&site).ok_or_else(|| {
                Error::InvariantViolation(format!("Missing transfer pool for site {}", site))
            })?;

            let is_executable = ft.executable;
            if is_executable && xbit_needed {
                staged_files.push(ft.clone());
            }

            let container = pool.add_transfer(vec![ft], level_in_name, JobType::StageIn)?;
            let new_job_name = container.tx_name().to_string();

            if is_executable && xbit_needed {
                stage_in_exec_jobs.push(new_job_name.clone());
                state.record_setup_job(key.clone(), implementation.set_xbit_job_name(&job_name, 0));
            }

            state.record_transfer(key, new_job_name.clone());
            // even if the job has duplicate input files only one
            // instance of the transfer is scheduled
            temp_set.insert(new_job_name);
        }
    }

    // one permission-fix job per compute job per flush, wired
    // stage-in -> fix-up -> compute
    if !staged_files.is_empty() {
        let xbit_job = implementation.create_set_xbit_job(job, &staged_files, JobType::StageIn, 0);
        let xbit_name = xbit_job.name.clone();
        dag.add_job(xbit_job)?;

        let mut edges_added: BTreeSet<String> = BTreeSet::new();
        for tx_job in &stage_in_exec_jobs {
            if edges_added.insert(tx_job.clone()) {
                state.add_relation(tx_job, &xbit_name);
            } else {
                log::debug!("Not adding edge {} -> {}", tx_job, xbit_name);
            }
        }
        state.add_relation(&xbit_name, &job_name);
    }

    state.add_pending_parents(&job_name, temp_set);
    Ok(())
}

/// Flushes a stage-in site map: every used container becomes one
/// transfer job. Returns the names of the jobs created.
pub fn flush_stage_in_map(
    dag: &mut Dag,
    map: SiteMap,
    implementation: &Arc<dyn Implementation>,
    local_transfer: bool,
    level: Option<i32>,
) -> Result<Vec<String>> {
    let mut tx_jobs = Vec::new();
    for (site, pool) in map {
        log::debug!("Adding stage in transfer nodes for site {}", site);
        let template = template_job(&site, level.unwrap_or(-1));
        let run_site = if local_transfer { "local" } else { site.as_str() };

        for container in pool.into_containers() {
            log::debug!("Adding stagein transfer node {}", container.tx_name());
            let tx_job = implementation.create_transfer_job(
                &template,
                run_site,
                container.file_transfers(),
                None,
                container.tx_name(),
                JobType::StageIn,
            );
            tx_jobs.push(tx_job.name.clone());
            dag.add_job(tx_job)?;
        }
    }
    Ok(tx_jobs)
}

/// Schedules the stage-out `files` of `job` into the per-site pool map,
/// splitting them into physical movement and registration. Files can
/// need one, both, or neither.
#[allow(clippy::too_many_arguments)]
pub fn add_clustered_stage_out(
    state: &mut RefinementState,
    map: &mut SiteMap,
    job: &Job,
    files: Vec<FileTransfer>,
    local_transfer: bool,
    capacity: usize,
    level: i32,
    create_registration_jobs: bool,
    job_prefix: Option<String>,
    deleted_leaf: bool,
) -> Result<()> {
    let job_name = job.name.clone();
    let site = job.staging_site_handle.clone();
    let priority = job.base_priority()?;

    // stage-out and registration jobs that become children of the
    // compute job
    let mut children: BTreeSet<String> = BTreeSet::new();

    for mut ft in files {
        ft.priority = priority;
        let make_tx_node = !ft.transient_transfer;
        let make_reg_node = create_registration_jobs && ft.register;

        if !make_tx_node && !make_reg_node {
            continue;
        }

        let pool = map.entry(site.clone()).or_insert_with(|| {
            PoolTransfer::new(site.clone(), local_transfer, capacity, job_prefix.clone())
        });

        if make_tx_node {
            let container =
                pool.add_transfer(vec![ft.clone()], Some(level), JobType::StageOut)?;
            if !deleted_leaf {
                // edge compute -> stage-out only if the compute job was
                // not pruned by workflow reduction
                children.insert(container.tx_name().to_string());
            }
            if make_reg_node {
                container.add_registration_file(ft);
            }
        } else {
            // registration only: an empty slot keeps the naming stable
            // and the compute job links straight to the registration job
            let container = pool.add_transfer(Vec::new(), Some(level), JobType::StageOut)?;
            if !deleted_leaf {
                children.insert(container.reg_name().to_string());
            }
            container.add_registration_file(ft);
        }
    }

    for child in children {
        state.add_relation(&job_name, &child);
    }
    Ok(())
}

/// Flushes a stage-out site map: every used container becomes one
/// stage-out job (if it holds transfers) and one registration job (if
/// it holds registration files), wired transfer -> registration.
pub fn flush_stage_out_map(
    dag: &mut Dag,
    state: &mut RefinementState,
    map: SiteMap,
    implementation: &Arc<dyn Implementation>,
    rcb: Option<&Arc<dyn ReplicaCatalogBridge>>,
    local_transfer: bool,
    level: Option<i32>,
) -> Result<Vec<String>> {
    let mut tx_jobs = Vec::new();
    for (site, pool) in map {
        log::debug!("Adding jobs for staging out data from site {}", site);
        let template = template_job(&site, level.unwrap_or(-1));
        let run_site = if local_transfer { "local" } else { site.as_str() };

        for container in pool.into_containers() {
            let mut created_tx = false;
            if !container.file_transfers().is_empty() {
                log::debug!("Adding stage-out job {}", container.tx_name());
                let so_job = implementation.create_transfer_job(
                    &template,
                    run_site,
                    container.file_transfers(),
                    None,
                    container.tx_name(),
                    JobType::StageOut,
                );
                tx_jobs.push(so_job.name.clone());
                dag.add_job(so_job)?;
                created_tx = true;
            }

            if !container.registration_files().is_empty() {
                let rcb = rcb.ok_or_else(|| {
                    Error::InvariantViolation(
                        "Registration files collected without a replica catalog bridge".to_string(),
                    )
                })?;
                if created_tx {
                    state.add_relation(container.tx_name(), container.reg_name());
                }
                log::debug!("Adding registration job {}", container.reg_name());
                let reg_job = rcb.make_registration_job(
                    container.reg_name(),
                    &template,
                    container.registration_files(),
                );
                dag.add_job(reg_job)?;
            }
        }
    }
    Ok(tx_jobs)
}
