//! A refinement strategy that refuses to refine. Produces a workflow
//! without any transfer jobs, which is useful as a baseline when
//! measuring the cost of refinement itself.

use std::sync::Arc;

use crate::error::Result;
use crate::planner::dag::Dag;
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::Job;
use crate::planner::transfer::refiner::{Advisory, Refiner};
use crate::planner::transfer::replica_bridge::ReplicaCatalogBridge;

#[derive(Debug, Default)]
pub struct Empty;

impl Empty {
    pub fn new() -> Self {
        Empty
    }
}

impl Refiner for Empty {
    fn add_stage_in_nodes(
        &mut self,
        _dag: &mut Dag,
        _job: &Job,
        _files: Vec<FileTransfer>,
        _symlink_files: Vec<FileTransfer>,
    ) -> Result<()> {
        Ok(())
    }

    fn add_inter_site_nodes(
        &mut self,
        _dag: &mut Dag,
        _job: &Job,
        _files: Vec<FileTransfer>,
        _local_transfer: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn add_stage_out_nodes(
        &mut self,
        _dag: &mut Dag,
        _job: &Job,
        _files: Vec<FileTransfer>,
        _rcb: Arc<dyn ReplicaCatalogBridge>,
        _local_transfer: bool,
        _deleted_leaf: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn done(&mut self, _dag: &mut Dag) -> Result<Vec<Advisory>> {
        Ok(Vec::new())
    }

    fn description(&self) -> &'static str {
        "No transfer jobs are created at all"
    }
}
