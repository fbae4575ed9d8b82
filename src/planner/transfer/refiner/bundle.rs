//! Bundling strategy: stage-in transfers for a site are spread over a
//! fixed number of round-robin slots for the whole run, stage-out
//! transfers per level. Kept for compatibility; superseded by the
//! balanced clustering strategy.

use std::mem;
use std::sync::Arc;

use crate::error::Result;
use crate::planner::dag::Dag;
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::Job;
use crate::planner::transfer::refiner::basic::add_direct_inter_site;
use crate::planner::transfer::refiner::cluster_value::ClusterValue;
use crate::planner::transfer::refiner::clustered::{
    add_clustered_stage_in, add_clustered_stage_out, flush_stage_in_map, flush_stage_out_map,
    SiteMap,
};
use crate::planner::transfer::refiner::state::RefinementState;
use crate::planner::transfer::refiner::{
    Advisory, Refiner, RefinerBag, BUNDLE_LOCAL_STAGE_IN_KEY, BUNDLE_LOCAL_STAGE_OUT_KEY,
    BUNDLE_REMOTE_STAGE_IN_KEY, BUNDLE_REMOTE_STAGE_OUT_KEY, BUNDLE_STAGE_IN_KEY,
    BUNDLE_STAGE_OUT_KEY,
};
use crate::planner::transfer::replica_bridge::ReplicaCatalogBridge;

/// Bundle factor used when neither the site catalog nor the properties
/// configure one.
pub const DEFAULT_BUNDLE_FACTOR: usize = 2;

pub struct Bundle {
    bag: RefinerBag,
    state: RefinementState,

    stage_in_local_map: SiteMap,
    stage_in_remote_map: SiteMap,
    stage_out_local_map: SiteMap,
    stage_out_remote_map: SiteMap,

    stage_in_local_bundle: ClusterValue,
    stage_in_remote_bundle: ClusterValue,
    stage_out_local_bundle: ClusterValue,
    stage_out_remote_bundle: ClusterValue,

    current_stage_out_level: Option<i32>,
    rcb: Option<Arc<dyn ReplicaCatalogBridge>>,
}

impl Bundle {
    pub fn new(bag: RefinerBag) -> Result<Self> {
        let mut state = RefinementState::new();
        let default = Some(DEFAULT_BUNDLE_FACTOR);

        let stage_in_local_bundle = ClusterValue::initialize(
            BUNDLE_LOCAL_STAGE_IN_KEY,
            BUNDLE_STAGE_IN_KEY,
            default,
            &bag.properties,
            false,
            &mut state.advisories,
        )?;
        let stage_in_remote_bundle = ClusterValue::initialize(
            BUNDLE_REMOTE_STAGE_IN_KEY,
            BUNDLE_STAGE_IN_KEY,
            default,
            &bag.properties,
            false,
            &mut state.advisories,
        )?;
        let stage_out_local_bundle = ClusterValue::initialize(
            BUNDLE_LOCAL_STAGE_OUT_KEY,
            BUNDLE_STAGE_OUT_KEY,
            default,
            &bag.properties,
            false,
            &mut state.advisories,
        )?;
        let stage_out_remote_bundle = ClusterValue::initialize(
            BUNDLE_REMOTE_STAGE_OUT_KEY,
            BUNDLE_STAGE_OUT_KEY,
            default,
            &bag.properties,
            false,
            &mut state.advisories,
        )?;

        Ok(Bundle {
            bag,
            state,
            stage_in_local_map: SiteMap::new(),
            stage_in_remote_map: SiteMap::new(),
            stage_out_local_map: SiteMap::new(),
            stage_out_remote_map: SiteMap::new(),
            stage_in_local_bundle,
            stage_in_remote_bundle,
            stage_out_local_bundle,
            stage_out_remote_bundle,
            current_stage_out_level: None,
            rcb: None,
        })
    }

    fn flush_stage_out(&mut self, dag: &mut Dag) -> Result<()> {
        let level = self.current_stage_out_level;
        let map = mem::take(&mut self.stage_out_local_map);
        flush_stage_out_map(
            dag,
            &mut self.state,
            map,
            &self.bag.stage_out_implementation,
            self.rcb.as_ref(),
            true,
            level,
        )?;
        let map = mem::take(&mut self.stage_out_remote_map);
        flush_stage_out_map(
            dag,
            &mut self.state,
            map,
            &self.bag.stage_out_implementation,
            self.rcb.as_ref(),
            false,
            level,
        )?;
        Ok(())
    }
}

impl Refiner for Bundle {
    fn add_stage_in_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        symlink_files: Vec<FileTransfer>,
    ) -> Result<()> {
        let stage_in = Arc::clone(&self.bag.stage_in_implementation);
        add_clustered_stage_in(
            dag,
            &mut self.state,
            &mut self.stage_in_local_map,
            &self.stage_in_local_bundle,
            &self.bag,
            &stage_in,
            job,
            files,
            true,
            None,
            DEFAULT_BUNDLE_FACTOR,
        )?;
        let symlink = Arc::clone(&self.bag.symlink_implementation);
        add_clustered_stage_in(
            dag,
            &mut self.state,
            &mut self.stage_in_remote_map,
            &self.stage_in_remote_bundle,
            &self.bag,
            &symlink,
            job,
            symlink_files,
            false,
            None,
            DEFAULT_BUNDLE_FACTOR,
        )?;
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
        self.rcb = Some(Arc::clone(&rcb));
        let level = job.level;
        if self.current_stage_out_level != Some(level) {
            self.flush_stage_out(dag)?;
            self.current_stage_out_level = Some(level);
        }

        let (map, value) = if local_transfer {
            (&mut self.stage_out_local_map, &self.stage_out_local_bundle)
        } else {
            (&mut self.stage_out_remote_map, &self.stage_out_remote_bundle)
        };
        let capacity = value.determine(
            &self.bag.site_store,
            job,
            DEFAULT_BUNDLE_FACTOR,
            &mut self.state.advisories,
        )?;
        add_clustered_stage_out(
            &mut self.state,
            map,
            job,
            files,
            local_transfer,
            capacity,
            level,
            self.bag.properties.create_registration_jobs,
            self.bag.properties.job_prefix.clone(),
            deleted_leaf,
        )
    }

    fn done(&mut self, dag: &mut Dag) -> Result<Vec<Advisory>> {
        let map = mem::take(&mut self.stage_in_local_map);
        flush_stage_in_map(dag, map, &self.bag.stage_in_implementation, true, None)?;
        let map = mem::take(&mut self.stage_in_remote_map);
        flush_stage_in_map(dag, map, &self.bag.symlink_implementation, false, None)?;

        self.flush_stage_out(dag)?;

        self.state.commit_pending_parents(dag)?;
        self.state.commit_relations(dag)?;
        Ok(self.state.advisories.take())
    }

    fn description(&self) -> &'static str {
        "Stage-in jobs are clustered per site over the whole workflow, stage-out jobs per level"
    }
}
