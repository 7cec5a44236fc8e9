//! Service/backend registry
//!
//! Generalizes `atlas::dns::authority::Zones`'s `RwLock`-guarded `BTreeMap`
//! and atomic `load`/replace pattern from zone files to GSLB service
//! backends: a service name maps to a routing algorithm and a pool of
//! backends, and the whole map can be atomically swapped when configuration
//! is reloaded.

use std::collections::HashMap;
use std::net::IpAddr;

use parking_lot::RwLock;

use crate::dns::errors::GslbError;

/// A single endpoint a service can route to
#[derive(Debug, Clone, PartialEq)]
pub struct Backend {
    pub address: IpAddr,
    pub port: u16,
    pub weight: u32,
    pub region: Option<String>,
}

impl Backend {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Backend {
            address,
            port,
            weight: 1,
            region: None,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// A service name, its selected routing algorithm, and its backend pool
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub algorithm: String,
    pub backends: Vec<Backend>,
    pub ttl_seconds: Option<u32>,
}

impl ServiceEntry {
    pub fn new(name: impl Into<String>, algorithm: impl Into<String>) -> Self {
        ServiceEntry {
            name: name.into(),
            algorithm: algorithm.into(),
            backends: Vec::new(),
            ttl_seconds: None,
        }
    }
}

/// Normalizes a service FQDN: lowercased, trailing dot stripped, so lookups
/// are insensitive to case and trailing-root-label differences.
fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_lowercase()
}

/// Concurrent map of service name to its routing configuration
///
/// Reads (the query hot path) take a read lock; mutation (registration,
/// config reload) takes a write lock. `replace_all` swaps the entire map in
/// one critical section so queries never observe a half-updated registry.
pub struct Registry {
    services: RwLock<HashMap<String, ServiceEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            services: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, entry: ServiceEntry) {
        let key = normalize(&entry.name);
        self.services.write().insert(key, entry);
    }

    pub fn lookup(&self, name: &str) -> Option<ServiceEntry> {
        self.services.read().get(&normalize(name)).cloned()
    }

    /// Remove a service entirely. Returns `true` if a service with this name
    /// existed.
    pub fn remove(&self, name: &str) -> bool {
        self.services.write().remove(&normalize(name)).is_some()
    }

    /// Atomically replace the entire service set, e.g. on config reload
    pub fn replace_all(&self, entries: Vec<ServiceEntry>) {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            map.insert(normalize(&entry.name), entry);
        }
        *self.services.write() = map;
    }

    pub fn register_backend(&self, service: &str, backend: Backend) -> Result<(), GslbError> {
        let key = normalize(service);
        let mut guard = self.services.write();
        let entry = guard
            .get_mut(&key)
            .ok_or_else(|| GslbError::ServiceNotConfigured(service.to_string()))?;

        if let Some(existing) = entry
            .backends
            .iter_mut()
            .find(|b| b.address == backend.address && b.port == backend.port)
        {
            *existing = backend;
        } else {
            entry.backends.push(backend);
        }
        Ok(())
    }

    pub fn deregister_backend(
        &self,
        service: &str,
        address: IpAddr,
        port: u16,
    ) -> Result<(), GslbError> {
        let key = normalize(service);
        let mut guard = self.services.write();
        let entry = guard
            .get_mut(&key)
            .ok_or_else(|| GslbError::ServiceNotConfigured(service.to_string()))?;

        let before = entry.backends.len();
        entry
            .backends
            .retain(|b| !(b.address == address && b.port == port));

        if entry.backends.len() == before {
            return Err(GslbError::BackendNotFound(format!("{}:{}", address, port)));
        }
        Ok(())
    }

    pub fn update_backend_weight(
        &self,
        service: &str,
        address: IpAddr,
        port: u16,
        weight: u32,
    ) -> Result<(), GslbError> {
        let key = normalize(service);
        let mut guard = self.services.write();
        let entry = guard
            .get_mut(&key)
            .ok_or_else(|| GslbError::ServiceNotConfigured(service.to_string()))?;

        let backend = entry
            .backends
            .iter_mut()
            .find(|b| b.address == address && b.port == port)
            .ok_or_else(|| GslbError::BackendNotFound(format!("{}:{}", address, port)))?;

        backend.weight = weight;
        Ok(())
    }

    pub fn list_services(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn backend(octet: u8) -> Backend {
        Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, octet)), 80)
    }

    #[test]
    fn lookup_is_case_and_dot_insensitive() {
        let registry = Registry::new();
        registry.register(ServiceEntry::new("Api.Example.com.", "round-robin"));

        assert!(registry.lookup("api.example.com").is_some());
        assert!(registry.lookup("API.EXAMPLE.COM.").is_some());
    }

    #[test]
    fn register_backend_requires_known_service() {
        let registry = Registry::new();
        let err = registry
            .register_backend("missing.example.com", backend(1))
            .unwrap_err();
        assert!(matches!(err, GslbError::ServiceNotConfigured(_)));
    }

    #[test]
    fn register_backend_updates_existing_entry() {
        let registry = Registry::new();
        registry.register(ServiceEntry::new("api.example.com", "round-robin"));
        registry
            .register_backend("api.example.com", backend(1).with_weight(1))
            .unwrap();
        registry
            .register_backend("api.example.com", backend(1).with_weight(5))
            .unwrap();

        let entry = registry.lookup("api.example.com").unwrap();
        assert_eq!(entry.backends.len(), 1);
        assert_eq!(entry.backends[0].weight, 5);
    }

    #[test]
    fn deregister_backend_removes_matching_entry() {
        let registry = Registry::new();
        registry.register(ServiceEntry::new("api.example.com", "round-robin"));
        registry.register_backend("api.example.com", backend(1)).unwrap();

        registry
            .deregister_backend(
                "api.example.com",
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                80,
            )
            .unwrap();

        assert!(registry.lookup("api.example.com").unwrap().backends.is_empty());
    }

    #[test]
    fn remove_drops_a_registered_service() {
        let registry = Registry::new();
        registry.register(ServiceEntry::new("api.example.com", "round-robin"));

        assert!(registry.remove("API.example.com."));
        assert!(registry.lookup("api.example.com").is_none());
        assert!(!registry.remove("api.example.com"));
    }

    #[test]
    fn replace_all_is_atomic_swap() {
        let registry = Registry::new();
        registry.register(ServiceEntry::new("old.example.com", "round-robin"));

        registry.replace_all(vec![ServiceEntry::new("new.example.com", "failover")]);

        assert!(registry.lookup("old.example.com").is_none());
        assert!(registry.lookup("new.example.com").is_some());
    }
}
