use crate::error::{Error, Result};
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::JobType;
use crate::planner::transfer::refiner::{
    LOCAL_PREFIX, REGISTER_PREFIX, REMOTE_PREFIX, STAGE_IN_PREFIX, STAGE_OUT_PREFIX,
};

/// Accumulates the file transfers one eventual physical job is
/// responsible for, together with the registration files an associated
/// registration job may have to record. One container becomes exactly
/// one transfer job, or is discarded if it stays empty.
#[derive(Debug, Clone)]
pub struct TransferContainer {
    tx_name: String,
    reg_name: String,
    file_transfers: Vec<FileTransfer>,
    registration_files: Vec<FileTransfer>,
}

impl TransferContainer {
    fn new(tx_name: String, reg_name: String) -> Self {
        TransferContainer {
            tx_name,
            reg_name,
            file_transfers: Vec::new(),
            registration_files: Vec::new(),
        }
    }

    pub fn tx_name(&self) -> &str {
        &self.tx_name
    }

    pub fn reg_name(&self) -> &str {
        &self.reg_name
    }

    pub fn add_transfer(&mut self, transfer: FileTransfer) {
        self.file_transfers.push(transfer);
    }

    pub fn add_transfers(&mut self, transfers: Vec<FileTransfer>) {
        self.file_transfers.extend(transfers);
    }

    pub fn add_registration_file(&mut self, file: FileTransfer) {
        self.registration_files.push(file);
    }

    pub fn file_transfers(&self) -> &[FileTransfer] {
        &self.file_transfers
    }

    pub fn registration_files(&self) -> &[FileTransfer] {
        &self.registration_files
    }
}

/// Per-site, per-direction transfer state: a fixed number of container
/// slots that file transfers are distributed over in strict round-robin
/// order. Slots are created lazily on first use; the cursor always
/// points at a valid slot index in `[0, capacity)`.
#[derive(Debug)]
pub struct PoolTransfer {
    site: String,
    local_transfer: bool,
    capacity: usize,
    next: usize,
    containers: Vec<Option<TransferContainer>>,
    job_prefix: Option<String>,
}

impl PoolTransfer {
    /// Creates the pool for `site` with `capacity` job slots. Resolvers
    /// guarantee a capacity of at least one; a smaller value is clamped.
    pub fn new(
        site: impl Into<String>,
        local_transfer: bool,
        capacity: usize,
        job_prefix: Option<String>,
    ) -> Self {
        let capacity = capacity.max(1);
        PoolTransfer {
            site: site.into(),
            local_transfer,
            capacity,
            next: 0,
            containers: (0..capacity).map(|_| None).collect(),
            job_prefix,
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_local_transfer(&self) -> bool {
        self.local_transfer
    }

    /// Adds file transfers to the container at the cursor, creating and
    /// naming the container on first use, then advances the cursor.
    /// `level` is part of the job name for per-level strategies and
    /// absent for the legacy whole-workflow bundling.
    pub fn add_transfer(
        &mut self,
        files: Vec<FileTransfer>,
        level: Option<i32>,
        kind: JobType,
    ) -> Result<&mut TransferContainer> {
        let slot = self.next;
        if self.containers[slot].is_none() {
            let tx_name = self.tx_job_name(slot, kind, level)?;
            let reg_name = self.reg_job_name(slot, level);
            self.containers[slot] = Some(TransferContainer::new(tx_name, reg_name));
        }

        let container = self.containers[slot]
            .as_mut()
            .ok_or_else(|| Error::InvariantViolation("Transfer container slot vanished".into()))?;
        container.add_transfers(files);

        self.next = (self.next + 1) % self.capacity;
        Ok(container)
    }

    /// The containers that were actually used, in slot order.
    pub fn containers(&self) -> impl Iterator<Item = &TransferContainer> {
        self.containers.iter().filter_map(Option::as_ref)
    }

    /// Consumes the pool, yielding the used containers in slot order.
    pub fn into_containers(self) -> Vec<TransferContainer> {
        self.containers.into_iter().flatten().collect()
    }

    /// Generates the transfer job name, unique within the workflow.
    fn tx_job_name(&self, slot: usize, kind: JobType, level: Option<i32>) -> Result<String> {
        let direction = match kind {
            JobType::StageIn => STAGE_IN_PREFIX,
            JobType::StageOut => STAGE_OUT_PREFIX,
            _ => {
                return Err(Error::InvariantViolation(format!(
                    "Wrong transfer job type {:?} for container naming",
                    kind
                )))
            }
        };
        let locality = if self.local_transfer { LOCAL_PREFIX } else { REMOTE_PREFIX };
        let prefix = self.job_prefix.as_deref().unwrap_or("");
        Ok(match level {
            Some(level) => format!("{}{}{}{}_{}_{}", direction, locality, prefix, self.site, level, slot),
            None => format!("{}{}{}{}_{}", direction, locality, prefix, self.site, slot),
        })
    }

    /// Generates the name of the registration job that may be associated
    /// with the slot's transfer job.
    fn reg_job_name(&self, slot: usize, level: Option<i32>) -> String {
        let prefix = self.job_prefix.as_deref().unwrap_or("");
        match level {
            Some(level) => format!("{}{}{}_{}_{}", REGISTER_PREFIX, prefix, self.site, level, slot),
            None => format!("{}{}{}_{}", REGISTER_PREFIX, prefix, self.site, slot),
        }
    }
}
