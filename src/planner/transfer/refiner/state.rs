use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::Result;
use crate::planner::dag::Dag;
use crate::planner::transfer::refiner::Advisory;

/// Ordered, deduplicated set of advisory messages collected over a
/// refinement run and emitted once at the end.
#[derive(Debug, Default)]
pub struct AdvisorySet {
    seen: HashSet<String>,
    messages: Vec<Advisory>,
}

impl AdvisorySet {
    pub fn new() -> Self {
        AdvisorySet::default()
    }

    /// Records a message, ignoring exact duplicates.
    pub fn record(&mut self, message: String) {
        if self.seen.insert(message.clone()) {
            self.messages.push(Advisory { message });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drains the collected advisories in insertion order.
    pub fn take(&mut self) -> Vec<Advisory> {
        self.seen.clear();
        std::mem::take(&mut self.messages)
    }
}

/// The mutable cross-call state every refinement strategy threads
/// through a run: the file-level dependency table, the pending and
/// direct relation maps, the permission-fix name table and the advisory
/// set.
///
/// The relation maps are ordered so committing them walks parents and
/// children in a reproducible order.
#[derive(Debug, Default)]
pub struct RefinementState {
    /// Keyed `lfn:site`; the value is the job that makes the file
    /// available at the site.
    file_table: HashMap<String, String>,

    /// Direct relations, parent -> children. Committed at `done`.
    relations: BTreeMap<String, BTreeSet<String>>,

    /// Pending relations, compute job -> parent names. Committed at
    /// level boundaries by the per-level strategies.
    pending_parents: BTreeMap<String, BTreeSet<String>>,

    /// Keyed like the file table; maps a staged executable to the name
    /// of the permission-fix job covering it.
    setup_map: HashMap<String, String>,

    pub advisories: AdvisorySet,
}

impl RefinementState {
    pub fn new() -> Self {
        RefinementState::default()
    }

    /// Constructs the dependency-table key for a logical file at a site.
    pub fn file_key(lfn: &str, site: &str) -> String {
        format!("{}:{}", lfn, site)
    }

    pub fn lookup_transfer(&self, key: &str) -> Option<&str> {
        self.file_table.get(key).map(String::as_str)
    }

    /// Records `job_name` as responsible for making the keyed file
    /// available. Later requests for the same key must become edges onto
    /// this job instead of new transfers.
    pub fn record_transfer(&mut self, key: String, job_name: String) {
        self.file_table.insert(key, job_name);
    }

    pub fn lookup_setup_job(&self, key: &str) -> Option<&str> {
        self.setup_map.get(key).map(String::as_str)
    }

    pub fn record_setup_job(&mut self, key: String, job_name: String) {
        log::debug!("Entered {} -> {}", key, job_name);
        self.setup_map.insert(key, job_name);
    }

    /// Adds a direct relation parent -> child, deduplicated.
    pub fn add_relation(&mut self, parent: &str, child: &str) {
        log::debug!("Adding relation {} -> {}", parent, child);
        self.relations
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
    }

    /// Merges `parents` into the pending parent set of `child`. The
    /// same parent may be discovered again for a different input file of
    /// the same job; the set keeps the edge unique.
    pub fn add_pending_parents(&mut self, child: &str, parents: BTreeSet<String>) {
        self.pending_parents
            .entry(child.to_string())
            .or_default()
            .extend(parents);
    }

    /// Commits the pending parent -> compute-job edges into the graph
    /// and clears the pending map. Called when a level (or the whole
    /// traversal) is complete.
    pub fn commit_pending_parents(&mut self, dag: &mut Dag) -> Result<()> {
        for (child, parents) in std::mem::take(&mut self.pending_parents) {
            log::debug!("Adding relations for job {}", child);
            for parent in parents {
                dag.add_edge(&parent, &child)?;
            }
        }
        Ok(())
    }

    /// Commits the direct relations into the graph. Called once at the
    /// very end of the traversal.
    pub fn commit_relations(&mut self, dag: &mut Dag) -> Result<()> {
        for (parent, children) in std::mem::take(&mut self.relations) {
            log::debug!("Adding relations for job {}", parent);
            for child in children {
                dag.add_edge(&parent, &child)?;
            }
        }
        Ok(())
    }
}

/// Adjusts the priorities of the transfer jobs created within one
/// flush: jobs are ordered by child count descending and consecutive
/// non-positive offsets are added to the priority each job already
/// carries, so the most depended-upon job keeps the highest priority.
pub fn assign_priority(dag: &mut Dag, tx_jobs: &[String]) {
    let mut ranked: Vec<(usize, &String)> = tx_jobs
        .iter()
        .map(|name| (dag.child_count(name), name))
        .collect();
    // stable sort keeps creation order among jobs with equal fan-out
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    for (offset, (children, name)) in ranked.into_iter().enumerate() {
        let adjustment = -(offset as i32);
        if let Some(job) = dag.get_job_mut(name) {
            job.priority += adjustment;
            log::debug!(
                "Assigned priority adjustment of {} to transfer job {} with children {}",
                adjustment,
                name,
                children
            );
        }
    }
}
