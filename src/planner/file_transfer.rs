use serde::Serialize;

/// A (site, url) pair naming one physical location of a logical file.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NameValue {
    pub site: String,
    pub url: String,
}

impl NameValue {
    pub fn new(site: impl Into<String>, url: impl Into<String>) -> Self {
        NameValue { site: site.into(), url: url.into() }
    }
}

/// A single file movement request handed to a refinement strategy: the
/// logical file, where it can be read from and where it has to end up,
/// plus the flags that decide whether it is physically moved, registered,
/// or needs its execute bit restored after transit.
#[derive(Serialize, Debug, Clone)]
pub struct FileTransfer {
    pub lfn: String,

    /// The compute job this request was generated for. For inter-site
    /// transfers this is the *producing* parent job.
    pub job_name: String,

    /// Candidate source locations, in preference order.
    pub sources: Vec<NameValue>,

    /// Destination locations, in preference order.
    pub dests: Vec<NameValue>,

    /// True if the file must not be physically moved at stage-out.
    pub transient_transfer: bool,

    /// True if the materialized file is to be registered in the replica
    /// catalog.
    pub register: bool,

    /// True for staged executables.
    pub executable: bool,

    pub priority: i32,
}

impl FileTransfer {
    pub fn new(lfn: impl Into<String>, job_name: impl Into<String>) -> Self {
        FileTransfer {
            lfn: lfn.into(),
            job_name: job_name.into(),
            sources: Vec::new(),
            dests: Vec::new(),
            transient_transfer: false,
            register: false,
            executable: false,
            priority: 0,
        }
    }

    pub fn add_source(&mut self, site: impl Into<String>, url: impl Into<String>) {
        self.sources.push(NameValue::new(site, url));
    }

    pub fn add_dest(&mut self, site: impl Into<String>, url: impl Into<String>) {
        self.dests.push(NameValue::new(site, url));
    }

    /// The preferred source location, if any was recorded.
    pub fn source_url(&self) -> Option<&NameValue> {
        self.sources.first()
    }

    /// The preferred destination location, if any was recorded.
    pub fn dest_url(&self) -> Option<&NameValue> {
        self.dests.first()
    }
}
