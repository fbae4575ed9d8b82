use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::planner::job::{Job, JobType};

/// The level a deleted (reduced) compute job is accounted under.
pub const DELETED_JOBS_LEVEL: i32 = -1;

/// The shared mutable workflow graph all refinement strategies write
/// into. Nodes are indexed by job name; edges are deduplicated. Maps
/// that get iterated are ordered so that a run over the same input
/// always produces the same graph.
#[derive(Debug, Default)]
pub struct Dag {
    jobs: HashMap<String, Job>,

    /// Insertion order of job names, for deterministic traversal.
    order: Vec<String>,

    children: BTreeMap<String, BTreeSet<String>>,
    parents: BTreeMap<String, BTreeSet<String>>,
}

impl Dag {
    pub fn new() -> Self {
        Dag::default()
    }

    /// Adds a job node. Job names are unique within a workflow.
    pub fn add_job(&mut self, job: Job) -> Result<()> {
        if self.jobs.contains_key(&job.name) {
            return Err(Error::InvariantViolation(format!(
                "Duplicate job name '{}' in workflow",
                job.name
            )));
        }
        self.order.push(job.name.clone());
        self.jobs.insert(job.name.clone(), job);
        Ok(())
    }

    /// Adds an edge parent -> child. Adding the same edge twice is a
    /// no-op; referencing an unknown node is an internal error.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        if !self.jobs.contains_key(parent) || !self.jobs.contains_key(child) {
            return Err(Error::InvariantViolation(format!(
                "Cannot add edge {} -> {}: unknown job",
                parent, child
            )));
        }
        log::debug!("Adding Edge {} -> {}", parent, child);
        self.children.entry(parent.to_string()).or_default().insert(child.to_string());
        self.parents.entry(child.to_string()).or_default().insert(parent.to_string());
        Ok(())
    }

    pub fn contains_job(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn get_job(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    pub fn get_job_mut(&mut self, name: &str) -> Option<&mut Job> {
        self.jobs.get_mut(name)
    }

    pub fn size(&self) -> usize {
        self.jobs.len()
    }

    /// Job names in insertion order.
    pub fn job_names(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(|name| self.jobs.get(name))
    }

    pub fn children(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.children.get(name)
    }

    pub fn child_count(&self, name: &str) -> usize {
        self.children.get(name).map_or(0, |c| c.len())
    }

    pub fn parent_count(&self, name: &str) -> usize {
        self.parents.get(name).map_or(0, |p| p.len())
    }

    pub fn has_edge(&self, parent: &str, child: &str) -> bool {
        self.children.get(parent).is_some_and(|c| c.contains(child))
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(|c| c.len()).sum()
    }

    /// Assigns every job its level: the longest distance (in edges) from
    /// the workflow roots. Fails on a dependency cycle.
    pub fn compute_levels(&mut self) -> Result<()> {
        let mut in_degree: HashMap<String, usize> = HashMap::new();
        for name in &self.order {
            in_degree.insert(name.clone(), self.parents.get(name).map_or(0, |p| p.len()));
        }

        let mut queue: VecDeque<String> = VecDeque::new();
        for name in &self.order {
            if in_degree[name] == 0 {
                if let Some(job) = self.jobs.get_mut(name) {
                    job.level = 0;
                }
                queue.push_back(name.clone());
            }
        }

        let mut visited = 0usize;
        while let Some(name) = queue.pop_front() {
            visited += 1;
            let level = self.jobs[&name].level;
            let children: Vec<String> = self
                .children
                .get(&name)
                .map(|c| c.iter().cloned().collect())
                .unwrap_or_default();
            for child in children {
                if let Some(job) = self.jobs.get_mut(&child) {
                    if job.level < level + 1 {
                        job.level = level + 1;
                    }
                }
                let degree = in_degree.get_mut(&child).ok_or_else(|| {
                    Error::InvariantViolation(format!("Unknown job '{}' in edge set", child))
                })?;
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }

        if visited != self.order.len() {
            return Err(Error::ConfigurationError(
                "Workflow dependencies contain a cycle".to_string(),
            ));
        }
        Ok(())
    }

    /// Counts the compute jobs at each level of the workflow.
    pub fn compute_jobs_per_level(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for job in self.jobs() {
            if job.job_type == JobType::Compute {
                *counts.entry(job.level).or_insert(0) += 1;
            }
        }
        counts
    }
}
