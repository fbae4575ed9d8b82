//! The default refinement strategy. Same per-level machinery as the
//! plain clustering variant, but the fallback capacity scales with the
//! number of compute jobs at each level, and lookups of the static
//! profile keys record scaling advisories so users can drop stale
//! configuration.

use std::sync::Arc;

use crate::error::Result;
use crate::planner::dag::Dag;
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::Job;
use crate::planner::transfer::refiner::cluster::{LevelFallback, PerLevelCore};
use crate::planner::transfer::refiner::cluster_value::{
    build_default_tx_jobs_per_level, NUM_COMPUTE_JOBS_PER_TRANSFER_JOB,
};
use crate::planner::transfer::refiner::{Advisory, Refiner, RefinerBag};
use crate::planner::transfer::replica_bridge::ReplicaCatalogBridge;

pub struct BalancedCluster {
    core: PerLevelCore,
}

impl BalancedCluster {
    pub fn new(dag: &Dag, bag: RefinerBag) -> Result<Self> {
        let defaults = build_default_tx_jobs_per_level(dag, NUM_COMPUTE_JOBS_PER_TRANSFER_JOB);
        let core = PerLevelCore::new(bag, None, LevelFallback::PerLevel(defaults), true)?;
        Ok(BalancedCluster { core })
    }
}

impl Refiner for BalancedCluster {
    fn add_stage_in_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        symlink_files: Vec<FileTransfer>,
    ) -> Result<()> {
        self.core.add_stage_in(dag, job, files, symlink_files)
    }

    fn add_inter_site_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        local_transfer: bool,
    ) -> Result<()> {
        self.core.add_inter_site(dag, job, files, local_transfer)
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
        self.core
            .add_stage_out(dag, job, files, rcb, local_transfer, deleted_leaf)
    }

    fn done(&mut self, dag: &mut Dag) -> Result<Vec<Advisory>> {
        self.core.finish(dag)
    }

    fn description(&self) -> &'static str {
        "Stage-in and stage-out jobs are clustered per level, scaled to the compute jobs at that level"
    }
}
