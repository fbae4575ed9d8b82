//! Chained stage-in: transfer jobs are created per compute job as in
//! the basic strategy, but the jobs targeting one site are linked into
//! a fixed number of sequential chains. A site then serves at most
//! chain-length concurrent transfers instead of one per compute job.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::planner::dag::Dag;
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::Job;
use crate::planner::transfer::refiner::basic::{
    add_direct_inter_site, add_direct_stage_in, add_direct_stage_out,
};
use crate::planner::transfer::refiner::cluster_value::parse_factor;
use crate::planner::transfer::refiner::state::RefinementState;
use crate::planner::transfer::refiner::{
    Advisory, Refiner, RefinerBag, CHAIN_KEY, CHAIN_STAGE_IN_KEY,
};
use crate::planner::transfer::replica_bridge::ReplicaCatalogBridge;

/// Chain length used when neither the site catalog nor the properties
/// configure one. A length of one serializes all stage-in to a site.
pub const DEFAULT_CHAIN_LENGTH: usize = 1;

/// The chain slots of one site. `last` holds the tail job of each
/// chain; the cursor distributes new jobs over the slots round-robin.
struct SiteChains {
    next: usize,
    last: Vec<Option<String>>,
}

impl SiteChains {
    fn new(length: usize) -> Self {
        SiteChains { next: 0, last: vec![None; length.max(1)] }
    }

    /// Appends `job_name` to the chain at the cursor and returns the
    /// previous tail it has to run after, if the chain was non-empty.
    fn append(&mut self, job_name: String) -> Option<String> {
        let slot = self.next;
        let previous = self.last[slot].replace(job_name);
        self.next = (self.next + 1) % self.last.len();
        previous
    }
}

pub struct Chain {
    bag: RefinerBag,
    state: RefinementState,
    chains: BTreeMap<String, SiteChains>,
}

impl Chain {
    pub fn new(bag: RefinerBag) -> Self {
        Chain { bag, state: RefinementState::new(), chains: BTreeMap::new() }
    }

    /// Resolves the chain length for a site: the specific site-catalog
    /// profile, the generic one, the properties, then the default.
    fn chain_length(&self, site: &str) -> Result<usize> {
        if let Some(entry) = self.bag.site_store.lookup(site) {
            if let Some(value) = entry.profile(CHAIN_STAGE_IN_KEY) {
                return parse_factor(CHAIN_STAGE_IN_KEY, value);
            }
            if let Some(value) = entry.profile(CHAIN_KEY) {
                return parse_factor(CHAIN_KEY, value);
            }
        }
        if let Some(value) = self.bag.properties.profile(CHAIN_STAGE_IN_KEY) {
            return parse_factor(CHAIN_STAGE_IN_KEY, value);
        }
        Ok(DEFAULT_CHAIN_LENGTH)
    }

    /// Schedules a freshly created stage-in job onto one of the site's
    /// chains, recording the edge from the previous job in that chain.
    fn chain_stage_in_job(&mut self, site: &str, tx_name: String) -> Result<()> {
        if !self.chains.contains_key(site) {
            let length = self.chain_length(site)?;
            log::debug!("Using chain length {} for site {}", length, site);
            self.chains.insert(site.to_string(), SiteChains::new(length));
        }
        let chains = self.chains.get_mut(site).ok_or_else(|| {
            Error::InvariantViolation(format!("Missing chain state for site {}", site))
        })?;

        if let Some(previous) = chains.append(tx_name.clone()) {
            self.state.add_relation(&previous, &tx_name);
        }
        Ok(())
    }
}

impl Refiner for Chain {
    fn add_stage_in_nodes(
        &mut self,
        dag: &mut Dag,
        job: &Job,
        files: Vec<FileTransfer>,
        symlink_files: Vec<FileTransfer>,
    ) -> Result<()> {
        let site = job.staging_site_handle.clone();

        let stage_in = Arc::clone(&self.bag.stage_in_implementation);
        if let Some(tx_name) =
            add_direct_stage_in(dag, &mut self.state, &self.bag, job, files, true, &stage_in)?
        {
            self.chain_stage_in_job(&site, tx_name)?;
        }

        let symlink = Arc::clone(&self.bag.symlink_implementation);
        if let Some(tx_name) = add_direct_stage_in(
            dag,
            &mut self.state,
            &self.bag,
            job,
            symlink_files,
            false,
            &symlink,
        )? {
            self.chain_stage_in_job(&site, tx_name)?;
        }
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
        "Stage-in jobs for a site are chained into a bounded number of sequential lists"
    }
}
