use std::collections::HashMap;

use crate::api::site_dto::SiteCatalogDto;

/// One site catalog entry: the site handle and its profile bag.
#[derive(Debug, Clone)]
pub struct SiteCatalogEntry {
    pub handle: String,
    pub profiles: HashMap<String, String>,
}

impl SiteCatalogEntry {
    pub fn profile(&self, key: &str) -> Option<&str> {
        self.profiles.get(key).map(String::as_str)
    }
}

/// In-memory view of the site catalog, reduced to the profile lookups
/// the transfer refiners need.
#[derive(Debug, Clone, Default)]
pub struct SiteStore {
    entries: HashMap<String, SiteCatalogEntry>,
}

impl SiteStore {
    pub fn new() -> Self {
        SiteStore::default()
    }

    pub fn from_dto(dto: SiteCatalogDto) -> Self {
        let mut entries = HashMap::new();
        for site in dto.sites {
            entries.insert(
                site.handle.clone(),
                SiteCatalogEntry { handle: site.handle, profiles: site.profiles },
            );
        }
        SiteStore { entries }
    }

    pub fn lookup(&self, site: &str) -> Option<&SiteCatalogEntry> {
        self.entries.get(site)
    }
}
