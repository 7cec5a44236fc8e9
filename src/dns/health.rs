//! Per-backend health view
//!
//! Health probing itself (the active checks that decide a backend's state)
//! is an external collaborator; this module only defines the read-only
//! contract routers and the query handler consult, and an in-memory
//! implementation suitable for a probing subsystem to publish into.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

/// Read-only view over backend health
///
/// A backend absent from the view is treated as healthy — the registry is
/// the source of truth for which backends exist; this trait only narrows
/// that set.
pub trait HealthView: Send + Sync {
    fn is_healthy(&self, address: IpAddr, port: u16) -> bool;
}

/// In-memory health view backed by an atomic-per-entry map
///
/// Probing code (out of scope here) calls `set_healthy` as checks complete;
/// `is_healthy` is a pure, non-blocking read used on the query hot path.
pub struct InMemoryHealthView {
    entries: RwLock<HashMap<(IpAddr, u16), AtomicBool>>,
}

impl InMemoryHealthView {
    pub fn new() -> Self {
        InMemoryHealthView {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_healthy(&self, address: IpAddr, port: u16, healthy: bool) {
        let guard = self.entries.read();
        if let Some(flag) = guard.get(&(address, port)) {
            flag.store(healthy, Ordering::Release);
            return;
        }
        drop(guard);

        self.entries
            .write()
            .entry((address, port))
            .or_insert_with(|| AtomicBool::new(true))
            .store(healthy, Ordering::Release);
    }

    pub fn remove(&self, address: IpAddr, port: u16) {
        self.entries.write().remove(&(address, port));
    }
}

impl Default for InMemoryHealthView {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthView for InMemoryHealthView {
    fn is_healthy(&self, address: IpAddr, port: u16) -> bool {
        self.entries
            .read()
            .get(&(address, port))
            .map(|flag| flag.load(Ordering::Acquire))
            .unwrap_or(true)
    }
}
