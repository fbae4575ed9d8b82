//! Per-level clustering: transfer pools are flushed and reset at every
//! level boundary, so a container never mixes files of compute jobs
//! from different levels. The balanced variant layers adaptive defaults
//! and advisories on top of the same core.

use std::collections::BTreeMap;
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
use crate::planner::transfer::refiner::state::{assign_priority, RefinementState};
use crate::planner::transfer::refiner::{
    Advisory, Refiner, RefinerBag, CLUSTER_LOCAL_STAGE_IN_KEY, CLUSTER_LOCAL_STAGE_OUT_KEY,
    CLUSTER_REMOTE_STAGE_IN_KEY, CLUSTER_REMOTE_STAGE_OUT_KEY, CLUSTER_STAGE_IN_KEY,
    CLUSTER_STAGE_OUT_KEY,
};
use crate::planner::transfer::replica_bridge::ReplicaCatalogBridge;

/// Cluster factor used when neither the site catalog nor the properties
/// configure one.
pub const DEFAULT_CLUSTER_FACTOR: usize = 2;

/// Capacity used when profile and property lookups come up empty:
/// either one fixed value, or a per-level table sized to the workflow.
pub(crate) enum LevelFallback {
    Fixed(usize),
    PerLevel(BTreeMap<i32, usize>),
}

impl LevelFallback {
    fn for_level(&self, level: i32) -> usize {
        match self {
            LevelFallback::Fixed(capacity) => *capacity,
            LevelFallback::PerLevel(map) => map.get(&level).copied().unwrap_or(1),
        }
    }
}

/// The per-level refinement machinery shared by the clustering
/// variants: four site maps, their capacity resolvers, and the level
/// cursors that trigger flushes.
pub(crate) struct PerLevelCore {
    bag: RefinerBag,
    state: RefinementState,

    stage_in_local_map: SiteMap,
    stage_in_remote_map: SiteMap,
    stage_out_local_map: SiteMap,
    stage_out_remote_map: SiteMap,

    stage_in_local_value: ClusterValue,
    stage_in_remote_value: ClusterValue,
    stage_out_local_value: ClusterValue,
    stage_out_remote_value: ClusterValue,

    fallback: LevelFallback,
    current_stage_in_level: Option<i32>,
    current_stage_out_level: Option<i32>,
    rcb: Option<Arc<dyn ReplicaCatalogBridge>>,
}

impl PerLevelCore {
    pub(crate) fn new(
        bag: RefinerBag,
        static_default: Option<usize>,
        fallback: LevelFallback,
        advise: bool,
    ) -> Result<Self> {
        let mut state = RefinementState::new();

        let stage_in_local_value = ClusterValue::initialize(
            CLUSTER_LOCAL_STAGE_IN_KEY,
            CLUSTER_STAGE_IN_KEY,
            static_default,
            &bag.properties,
            advise,
            &mut state.advisories,
        )?;
        let stage_in_remote_value = ClusterValue::initialize(
            CLUSTER_REMOTE_STAGE_IN_KEY,
            CLUSTER_STAGE_IN_KEY,
            static_default,
            &bag.properties,
            advise,
            &mut state.advisories,
        )?;
        let stage_out_local_value = ClusterValue::initialize(
            CLUSTER_LOCAL_STAGE_OUT_KEY,
            CLUSTER_STAGE_OUT_KEY,
            static_default,
            &bag.properties,
            advise,
            &mut state.advisories,
        )?;
        let stage_out_remote_value = ClusterValue::initialize(
            CLUSTER_REMOTE_STAGE_OUT_KEY,
            CLUSTER_STAGE_OUT_KEY,
            static_default,
            &bag.properties,
            advise,
            &mut state.advisories,
        )?;

        Ok(PerLevelCore {
            bag,
            state,
            stage_in_local_map: SiteMap::new(),
            stage_in_remote_map: SiteMap::new(),
            stage_out_local_map: SiteMap::new(),
            stage_out_remote_map: SiteMap::new(),
            stage_in_local_value,
            stage_in_remote_value,
            stage_out_local_value,
            stage_out_remote_value,
            fallback,
            current_stage_in_level: None,
            current_stage_out_level: None,
            rcb: None,
        })
    }

    /// Materializes the open stage-in containers of the current level,
    /// commits the pending compute-job edges and assigns the fan-out
    /// priorities among the jobs just created.
    fn flush_stage_in(&mut self, dag: &mut Dag) -> Result<()> {
        let level = self.current_stage_in_level;
        let map = mem::take(&mut self.stage_in_local_map);
        let mut tx_jobs =
            flush_stage_in_map(dag, map, &self.bag.stage_in_implementation, true, level)?;
        let map = mem::take(&mut self.stage_in_remote_map);
        tx_jobs.extend(flush_stage_in_map(
            dag,
            map,
            &self.bag.symlink_implementation,
            false,
            level,
        )?);

        self.state.commit_pending_parents(dag)?;
        if !tx_jobs.is_empty() {
            assign_priority(dag, &tx_jobs);
        }
        Ok(())
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

    pub(crate) fn add_stage_in(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        symlink_files: Vec<FileTransfer>,
    ) -> Result<()> {
        let level = job.level;
        if self.current_stage_in_level != Some(level) {
            self.flush_stage_in(dag)?;
            self.current_stage_in_level = Some(level);
        }

        let fallback = self.fallback.for_level(level);
        let stage_in = Arc::clone(&self.bag.stage_in_implementation);
        add_clustered_stage_in(
            dag,
            &mut self.state,
            &mut self.stage_in_local_map,
            &self.stage_in_local_value,
            &self.bag,
            &stage_in,
            job,
            files,
            true,
            Some(level),
            fallback,
        )?;
        let symlink = Arc::clone(&self.bag.symlink_implementation);
        add_clustered_stage_in(
            dag,
            &mut self.state,
            &mut self.stage_in_remote_map,
            &self.stage_in_remote_value,
            &self.bag,
            &symlink,
            job,
            symlink_files,
            false,
            Some(level),
            fallback,
        )?;
        Ok(())
    }

    pub(crate) fn add_inter_site(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        local_transfer: bool,
    ) -> Result<()> {
        add_direct_inter_site(dag, &mut self.state, &self.bag, job, files, local_transfer)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn add_stage_out(
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

        let fallback = self.fallback.for_level(level);
        let (map, value) = if local_transfer {
            (&mut self.stage_out_local_map, &self.stage_out_local_value)
        } else {
            (&mut self.stage_out_remote_map, &self.stage_out_remote_value)
        };
        let capacity =
            value.determine(&self.bag.site_store, job, fallback, &mut self.state.advisories)?;
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

    pub(crate) fn finish(&mut self, dag: &mut Dag) -> Result<Vec<Advisory>> {
        self.flush_stage_in(dag)?;
        self.flush_stage_out(dag)?;
        self.state.commit_relations(dag)?;
        Ok(self.state.advisories.take())
    }
}

pub struct Cluster {
    core: PerLevelCore,
}

impl Cluster {
    pub fn new(_dag: &Dag, bag: RefinerBag) -> Result<Self> {
        let core = PerLevelCore::new(
            bag,
            Some(DEFAULT_CLUSTER_FACTOR),
            LevelFallback::Fixed(DEFAULT_CLUSTER_FACTOR),
            false,
        )?;
        Ok(Cluster { core })
    }
}

impl Refiner for Cluster {
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
        "Stage-in and stage-out jobs are clustered per level with a configured cluster factor"
    }
}
