use serde::Serialize;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// The profile key carrying the base scheduling priority of a compute job.
pub const PRIORITY_PROFILE_KEY: &str = "priority";

/// The kind of a workflow node. Compute jobs come in from the abstract
/// workflow; all other kinds are inserted by the transfer refiners.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    Compute,
    StageIn,
    StageOut,
    InterSite,
    /// Restores the execute bit on staged executables.
    SetXBit,
    /// Records a materialized file's location in the replica catalog.
    Registration,
}

/// A node of the executable workflow graph.
///
/// Jobs are created either by compute-job scheduling (upstream of this
/// crate) or by a refinement strategy, and are never removed once added
/// to the graph. Job kind and priority may be adjusted after creation.
#[derive(Serialize, Debug, Clone)]
pub struct Job {
    pub name: String,

    /// The execution site of the job.
    pub site_handle: String,

    /// The site data is staged to/from for this job.
    pub staging_site_handle: String,

    /// Distance from the workflow roots; -1 until levels are computed.
    pub level: i32,

    pub job_type: JobType,

    /// Scheduling priority. Transfer jobs get a non-positive adjustment
    /// assigned on top of the compute job's base priority.
    pub priority: i32,

    /// The logical files this job moves or registers.
    pub lfns: Vec<String>,

    /// Paths handed to the local scheduler's own file transfer mechanism.
    /// Only populated by the Condor passthrough refiner.
    pub transfer_input_files: Vec<String>,

    /// Profile key/value pairs associated with the job.
    pub profiles: HashMap<String, String>,
}

impl Job {
    pub fn new(name: impl Into<String>, site: impl Into<String>, job_type: JobType) -> Self {
        let site = site.into();
        Job {
            name: name.into(),
            staging_site_handle: site.clone(),
            site_handle: site,
            level: -1,
            job_type,
            priority: 0,
            lfns: Vec::new(),
            transfer_input_files: Vec::new(),
            profiles: HashMap::new(),
        }
    }

    /// Returns the base priority associated with the job via the
    /// `priority` profile key. Defaults to 0. A malformed value is a
    /// configuration error that aborts the planning run.
    pub fn base_priority(&self) -> Result<i32> {
        match self.profiles.get(PRIORITY_PROFILE_KEY) {
            None => Ok(0),
            Some(value) => value.parse::<i32>().map_err(|_| {
                Error::ConfigurationError(format!(
                    "Invalid priority '{}' associated with job {}",
                    value, self.name
                ))
            }),
        }
    }
}
