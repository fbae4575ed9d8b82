use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::loader::parser::parse_json_file;

/// Run-level planner properties. All fields have defaults so an empty
/// properties file (or none at all) yields a usable configuration.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerProperties {
    /// When false, no replica registration jobs are created at all.
    pub create_registration_jobs: bool,

    /// When true, staged executables are chmod-ed by the worker wrapper
    /// itself and no permission-fix jobs are inserted into the graph.
    pub worker_node_execution: bool,

    /// Optional prefix applied to generated transfer/registration job
    /// basenames.
    pub job_prefix: Option<String>,

    /// The transfer refiner to load, by name.
    pub refiner: String,

    /// Profile key/value defaults from the properties file. Consulted
    /// after the site catalog during bundle-factor resolution.
    pub profiles: HashMap<String, String>,
}

impl Default for PlannerProperties {
    fn default() -> Self {
        PlannerProperties {
            create_registration_jobs: true,
            worker_node_execution: false,
            job_prefix: None,
            refiner: "BalancedCluster".to_string(),
            profiles: HashMap::new(),
        }
    }
}

impl PlannerProperties {
    pub fn load(file_path: &str) -> Result<Self> {
        parse_json_file::<PlannerProperties>(file_path)
    }

    pub fn profile(&self, key: &str) -> Option<&str> {
        self.profiles.get(key).map(String::as_str)
    }
}
