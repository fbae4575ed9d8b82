pub mod dag;
pub mod engine;
pub mod file_transfer;
pub mod job;
pub mod properties;
pub mod site_store;
pub mod transfer;
