//! Combined region resolution
//!
//! Three-stage precedence: an operator-configured CIDR override wins if
//! present, then a GeoIP country/continent lookup mapped through
//! `RegionConfig`, then the configured default region. The override trie
//! is held behind a lock so it can be mutated concurrently with the query
//! hot path, the same shape as `registry::Registry`'s service map.

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use parking_lot::RwLock;

use crate::geo::database::GeoDatabase;
use crate::geo::region::RegionConfig;
use crate::geo::trie::{CidrMapping, CidrTrie};

pub struct GeoResolver {
    overrides: RwLock<CidrTrie>,
    database: Option<Box<dyn GeoDatabase>>,
    regions: RegionConfig,
}

impl GeoResolver {
    pub fn new(overrides: CidrTrie, database: Option<Box<dyn GeoDatabase>>, regions: RegionConfig) -> Self {
        GeoResolver {
            overrides: RwLock::new(overrides),
            database,
            regions,
        }
    }

    /// Resolve a region name for a client address, in override -> GeoIP ->
    /// default order. Returns `None` only if no override matches, no
    /// database is configured (or it fails to resolve), and no default
    /// region is set.
    pub fn resolve(&self, client: IpAddr) -> Option<String> {
        if let Some(region) = self.overrides.read().lookup(client) {
            return Some(region.to_string());
        }

        if let Some(db) = &self.database {
            let country = db.country(client);
            let continent = db.continent(client);
            if let Some(region) = self
                .regions
                .resolve(country.as_deref(), continent.as_deref())
            {
                return Some(region);
            }
        }

        self.regions.default_region.clone()
    }

    /// Add a CIDR override mapping. A mapping with an existing prefix
    /// upserts.
    pub fn add(&self, mapping: CidrMapping) {
        self.overrides.write().add(mapping);
    }

    /// Remove the override mapping with this exact prefix. Returns `true`
    /// if a mapping was removed.
    pub fn remove(&self, prefix: IpNetwork) -> bool {
        self.overrides.write().remove(prefix)
    }

    /// Atomically replace the entire override set, e.g. on config reload.
    pub fn load_from_config(&self, mappings: Vec<CidrMapping>) {
        self.overrides.write().load_from_config(mappings);
    }

    /// All override mappings, lexicographically sorted by prefix.
    pub fn list(&self) -> Vec<CidrMapping> {
        self.overrides.read().list()
    }
}
