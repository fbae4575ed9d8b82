use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::planner::dag::{Dag, DELETED_JOBS_LEVEL};
use crate::planner::job::Job;
use crate::planner::properties::PlannerProperties;
use crate::planner::site_store::SiteStore;
use crate::planner::transfer::refiner::state::AdvisorySet;

/// Number of compute jobs a single transfer job is sized for when the
/// capacity falls back to the per-level default.
pub const NUM_COMPUTE_JOBS_PER_TRANSFER_JOB: f64 = 10.0;

/// Transfer-job default for the level that deleted jobs are grouped
/// under.
pub const DEFAULT_TX_JOBS_FOR_DELETED_JOBS: usize = 10;

const SCALING_MESSAGE_PREFIX: &str =
    "The planner scales transfer jobs with the size of the workflow.";
const SCALING_MESSAGE_PROPERTY: &str = "Consider removing the property";
const SCALING_MESSAGE_PROFILE: &str = "Consider removing the profile";

/// Resolves the bundle factor (container capacity) for a site.
///
/// Lookup order: the site catalog profile under the specific key, the
/// generic direction key on the same site entry, the property-file
/// default supplied at initialization, and finally the caller-supplied
/// fallback. Resolved capacities are explicit options rather than a
/// magic sentinel, so "not configured" can never collide with a real
/// value.
#[derive(Debug, Clone)]
pub struct ClusterValue {
    profile_key: &'static str,
    default_profile_key: &'static str,
    property_default: Option<usize>,

    /// Whether successful lookups record scaling advisories.
    advise: bool,
}

impl ClusterValue {
    /// Initializes the resolver, pulling the property-file default for
    /// `profile_key`/`default_profile_key` out of `properties`.
    /// `property_default` stays `None` when neither key is configured
    /// and no `static_default` is given.
    pub fn initialize(
        profile_key: &'static str,
        default_profile_key: &'static str,
        static_default: Option<usize>,
        properties: &PlannerProperties,
        advise: bool,
        advisories: &mut AdvisorySet,
    ) -> Result<Self> {
        let property_default = match properties.profile(profile_key) {
            Some(value) => {
                if advise {
                    advisories.record(format!(
                        "{} {} {} from the properties file",
                        SCALING_MESSAGE_PREFIX, SCALING_MESSAGE_PROPERTY, profile_key
                    ));
                }
                Some(parse_factor(profile_key, value)?)
            }
            None => match properties.profile(default_profile_key) {
                Some(value) => {
                    if advise {
                        advisories.record(format!(
                            "{} {} {} from the properties file",
                            SCALING_MESSAGE_PREFIX, SCALING_MESSAGE_PROPERTY, default_profile_key
                        ));
                    }
                    Some(parse_factor(default_profile_key, value)?)
                }
                None => static_default,
            },
        };

        Ok(ClusterValue { profile_key, default_profile_key, property_default, advise })
    }

    /// Determines the bundle factor for `job`'s staging site. Falls
    /// through to `fallback` when neither the site catalog nor the
    /// properties configure a value.
    pub fn determine(
        &self,
        site_store: &SiteStore,
        job: &Job,
        fallback: usize,
        advisories: &mut AdvisorySet,
    ) -> Result<usize> {
        let site = &job.staging_site_handle;

        if let Some(entry) = site_store.lookup(site) {
            if let Some(value) = entry.profile(self.profile_key) {
                if self.advise {
                    advisories.record(self.profile_advisory(self.profile_key, site));
                }
                return parse_factor(self.profile_key, value);
            }
            if let Some(value) = entry.profile(self.default_profile_key) {
                if self.advise {
                    advisories.record(self.profile_advisory(self.default_profile_key, site));
                }
                return parse_factor(self.default_profile_key, value);
            }
        }

        Ok(self.property_default.unwrap_or(fallback))
    }

    fn profile_advisory(&self, key: &str, site: &str) -> String {
        format!(
            "{} {} {} from site {} in the site catalog",
            SCALING_MESSAGE_PREFIX, SCALING_MESSAGE_PROFILE, key, site
        )
    }
}

/// Parses a configured bundle factor. A value that is not a positive
/// integer is a configuration error that aborts the run.
pub(crate) fn parse_factor(key: &str, value: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(parsed) if parsed >= 1 => Ok(parsed),
        _ => Err(Error::ConfigurationError(format!(
            "Invalid transfer clustering factor '{}' for key {}",
            value, key
        ))),
    }
}

/// Builds the per-level default transfer-job counts: one transfer job
/// per `divisor` compute jobs at that level, never less than one, with
/// a fixed default for the deleted-jobs level.
pub fn build_default_tx_jobs_per_level(dag: &Dag, divisor: f64) -> BTreeMap<i32, usize> {
    let mut map = BTreeMap::new();
    for (level, count) in dag.compute_jobs_per_level() {
        let jobs = ((count as f64) / divisor).ceil() as usize;
        let jobs = jobs.max(1);
        log::debug!("Number of default transfer jobs for level {} are {}", level, jobs);
        map.insert(level, jobs);
    }
    map.insert(DELETED_JOBS_LEVEL, DEFAULT_TX_JOBS_FOR_DELETED_JOBS);
    map
}
