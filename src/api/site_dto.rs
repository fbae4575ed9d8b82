use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The site catalog, reduced to the per-site profile bags the transfer
/// refiners consult for bundling/clustering/chain-length keys.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SiteCatalogDto {
    pub sites: Vec<SiteDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SiteDto {
    pub handle: String,

    #[serde(default)]
    pub profiles: HashMap<String, String>,
}
