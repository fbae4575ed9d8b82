pub mod api;
pub mod error;
pub mod loader;
pub mod logger;
pub mod planner;

use std::str::FromStr;
use std::sync::Arc;

use crate::api::site_dto::SiteCatalogDto;
use crate::api::workflow_dto::WorkflowDto;
use crate::error::Result;
use crate::loader::parser::parse_json_file;
use crate::planner::engine::{RefinedWorkflow, TransferEngine};
use crate::planner::properties::PlannerProperties;
use crate::planner::site_store::SiteStore;
use crate::planner::transfer::refiner::RefinerType;

/// Loads the abstract workflow plus the optional site catalog and
/// planner properties from disk and runs the configured refinement
/// strategy over it.
///
/// `refiner_override` takes precedence over the refiner named in the
/// properties file.
pub fn refine_workflow(
    workflow_path: &str,
    site_catalog_path: Option<&str>,
    properties_path: Option<&str>,
    refiner_override: Option<&str>,
) -> Result<RefinedWorkflow> {
    let properties = match properties_path {
        Some(path) => PlannerProperties::load(path)?,
        None => PlannerProperties::default(),
    };
    let site_store = match site_catalog_path {
        Some(path) => SiteStore::from_dto(parse_json_file::<SiteCatalogDto>(path)?),
        None => SiteStore::new(),
    };
    let workflow = parse_json_file::<WorkflowDto>(workflow_path)?;

    let refiner_name = refiner_override.unwrap_or(&properties.refiner);
    let refiner_type = RefinerType::from_str(refiner_name)?;

    let engine = TransferEngine::new(Arc::new(properties), Arc::new(site_store));
    engine.refine(&workflow, refiner_type)
}
