use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The abstract workflow as handed over by the upstream planning stages:
/// compute jobs, the logical files they use, and the control dependencies
/// between them. Data movement jobs do not appear here; inserting them is
/// the whole point of the refinement pass.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDto {
    pub name: String,

    /// The site the final outputs of the workflow are shipped to.
    pub output_site: String,

    pub jobs: Vec<JobDto>,

    #[serde(default)]
    pub dependencies: Vec<DependencyDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JobDto {
    pub id: String,

    /// The execution site the job has been scheduled onto.
    pub site: String,

    /// The staging site for the job. Defaults to the execution site.
    #[serde(default)]
    pub staging_site: Option<String>,

    /// Profile key/value pairs associated with the job (e.g. `priority`).
    #[serde(default)]
    pub profiles: HashMap<String, String>,

    #[serde(default)]
    pub uses: Vec<FileUseDto>,
}

/// A single logical file used by a job, either as input or output.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileUseDto {
    pub lfn: String,

    pub link: LinkDto,

    /// True for staged executables that need their execute bit restored.
    #[serde(default)]
    pub executable: bool,

    /// False marks the file transient: it is never physically moved.
    #[serde(default = "default_true")]
    pub transfer: bool,

    /// True if the materialized file must be registered in the replica
    /// catalog.
    #[serde(default)]
    pub register: bool,

    /// Known physical locations for an input file, in preference order.
    #[serde(default)]
    pub sources: Vec<ReplicaLocationDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkDto {
    Input,
    Output,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaLocationDto {
    pub site: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDto {
    pub parent: String,
    pub child: String,
}

fn default_true() -> bool {
    true
}
