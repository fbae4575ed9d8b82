pub mod site_dto;
pub mod workflow_dto;
