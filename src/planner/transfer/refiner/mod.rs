use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::planner::dag::Dag;
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::Job;
use crate::planner::properties::PlannerProperties;
use crate::planner::site_store::SiteStore;
use crate::planner::transfer::implementation::Implementation;
use crate::planner::transfer::replica_bridge::ReplicaCatalogBridge;

pub mod balanced_cluster;
pub mod basic;
pub mod bundle;
pub mod chain;
pub mod cluster;
pub mod clustered;
pub mod cluster_value;
pub mod condor;
pub mod empty;
pub mod pool_transfer;
pub mod state;

mod basic_tests;
mod chain_tests;
mod clustered_tests;
mod pool_transfer_tests;

/// Prefix for stage-in transfer job names.
pub const STAGE_IN_PREFIX: &str = "stage_in_";

/// Prefix for stage-out transfer job names.
pub const STAGE_OUT_PREFIX: &str = "stage_out_";

/// Prefix for inter-site transfer job names.
pub const INTER_SITE_PREFIX: &str = "stage_inter_";

/// Prefix for replica registration job names.
pub const REGISTER_PREFIX: &str = "register_";

/// Infix marking a transfer job that runs on the local site.
pub const LOCAL_PREFIX: &str = "local_";

/// Infix marking a transfer job that runs on the remote site.
pub const REMOTE_PREFIX: &str = "remote_";

// Profile keys consulted by the clustering refiners.
pub const CLUSTER_LOCAL_STAGE_IN_KEY: &str = "cluster.stagein.local";
pub const CLUSTER_REMOTE_STAGE_IN_KEY: &str = "cluster.stagein.remote";
pub const CLUSTER_STAGE_IN_KEY: &str = "cluster.stagein";
pub const CLUSTER_LOCAL_STAGE_OUT_KEY: &str = "cluster.stageout.local";
pub const CLUSTER_REMOTE_STAGE_OUT_KEY: &str = "cluster.stageout.remote";
pub const CLUSTER_STAGE_OUT_KEY: &str = "cluster.stageout";

// Profile keys consulted by the legacy bundle refiner.
pub const BUNDLE_LOCAL_STAGE_IN_KEY: &str = "bundle.stagein.local";
pub const BUNDLE_REMOTE_STAGE_IN_KEY: &str = "bundle.stagein.remote";
pub const BUNDLE_STAGE_IN_KEY: &str = "bundle.stagein";
pub const BUNDLE_LOCAL_STAGE_OUT_KEY: &str = "bundle.stageout.local";
pub const BUNDLE_REMOTE_STAGE_OUT_KEY: &str = "bundle.stageout.remote";
pub const BUNDLE_STAGE_OUT_KEY: &str = "bundle.stageout";

// Profile keys consulted by the chain refiner.
pub const CHAIN_STAGE_IN_KEY: &str = "chain.stagein";
pub const CHAIN_KEY: &str = "chain";

/// A deferred human-readable informational message collected during a
/// refinement run and surfaced once at the end. Observability only;
/// advisories never influence the produced graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub message: String,
}

/// The bag of collaborators a refinement strategy is wired to at
/// construction time.
#[derive(Clone)]
pub struct RefinerBag {
    pub site_store: Arc<SiteStore>,
    pub properties: Arc<PlannerProperties>,
    pub stage_in_implementation: Arc<dyn Implementation>,
    pub symlink_implementation: Arc<dyn Implementation>,
    pub inter_site_implementation: Arc<dyn Implementation>,
    pub stage_out_implementation: Arc<dyn Implementation>,
}

/// The contract every transfer refinement strategy implements.
///
/// The external transfer engine walks the workflow in dependency order
/// and, per compute job, hands the strategy the sets of files to move.
/// The strategy buckets them, records pending edges, and materializes
/// transfer jobs either immediately, at level boundaries, or at the
/// final `done` call, depending on the variant.
pub trait Refiner {
    /// Schedules the stage-in transfers for `job`: `files` are copied in
    /// by a transfer job, `symlink_files` are eligible for symlinking on
    /// the compute site.
    fn add_stage_in_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        symlink_files: Vec<FileTransfer>,
    ) -> Result<()>;

    /// Schedules transfers of a parent job's outputs directly to `job`'s
    /// site.
    fn add_inter_site_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        local_transfer: bool,
    ) -> Result<()>;

    /// Schedules the stage-out and registration of `job`'s outputs.
    /// `deleted_leaf` suppresses the compute -> stage-out edge for jobs
    /// pruned by upstream workflow reduction.
    fn add_stage_out_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        rcb: Arc<dyn ReplicaCatalogBridge>,
        local_transfer: bool,
        deleted_leaf: bool,
    ) -> Result<()>;

    /// Signals that the traversal of the workflow is done. Flushes every
    /// open container into concrete jobs, commits the pending edges and
    /// returns the advisories collected during the run. No further calls
    /// are accepted afterwards.
    fn done(&mut self, dag: &mut Dag) -> Result<Vec<Advisory>>;

    /// A short textual description of the refinement strategy.
    fn description(&self) -> &'static str;
}

/// The available transfer refinement strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinerType {
    Basic,
    Bundle,
    Cluster,
    BalancedCluster,
    Chain,
    Condor,
    Empty,
}

impl RefinerType {
    /// Factory method that constructs the refinement strategy and wires
    /// it to the transfer implementations and catalogs in `bag`. The
    /// workflow is needed up front by the per-level variants to size
    /// their level-default tables.
    pub fn get_instance(self, dag: &Dag, bag: RefinerBag) -> Result<Box<dyn Refiner>> {
        Ok(match self {
            RefinerType::Basic => Box::new(basic::Basic::new(bag)),
            RefinerType::Bundle => Box::new(bundle::Bundle::new(bag)?),
            RefinerType::Cluster => Box::new(cluster::Cluster::new(dag, bag)?),
            RefinerType::BalancedCluster => {
                Box::new(balanced_cluster::BalancedCluster::new(dag, bag)?)
            }
            RefinerType::Chain => Box::new(chain::Chain::new(bag)),
            RefinerType::Condor => Box::new(condor::Condor::new(bag)),
            RefinerType::Empty => Box::new(empty::Empty::new()),
        })
    }
}

impl FromStr for RefinerType {
    type Err = Error;

    fn from_str(name: &str) -> Result<RefinerType> {
        match name {
            "Basic" => Ok(RefinerType::Basic),
            "Bundle" => Ok(RefinerType::Bundle),
            "Cluster" => Ok(RefinerType::Cluster),
            "BalancedCluster" => Ok(RefinerType::BalancedCluster),
            "Chain" => Ok(RefinerType::Chain),
            "Condor" => Ok(RefinerType::Condor),
            "Empty" => Ok(RefinerType::Empty),
            _ => Err(Error::UnknownRefiner(name.to_string())),
        }
    }
}
