//! Learned latency tracking keyed by client prefix, service and region
//!
//! Where `latency::InMemoryLatencyProvider` tracks one EWMA per backend
//! from active probing, this tracks one EWMA per (client network prefix,
//! service name, region) tuple, learned passively from observed
//! query/response behavior, and ages entries out once they go stale.
//! Service name is part of the key because two unrelated services can
//! share region names over the same client subnet; keying on region alone
//! would make their measurements collide. Grounded on the same
//! EWMA-smoothing idiom as `latency.rs`, with staleness handling adapted
//! from the teacher's cache TTL-expiry checks in its response cache.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, SystemTime};

use ipnetwork::IpNetwork;
use parking_lot::RwLock;

const EWMA_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LearnedKey {
    client_prefix: IpNetwork,
    service_name: &'static str,
    region: &'static str,
}

#[derive(Debug, Clone)]
struct LearnedEntry {
    smoothed_ms: f64,
    sample_count: u32,
    last_updated: SystemTime,
}

/// Read side of learned latency tracking, consulted by the learned-latency
/// router
pub trait LearnedLatencyProvider: Send + Sync {
    fn learned_latency_ms(&self, client: IpAddr, service: &str, region: &str) -> Option<f64>;
}

/// In-memory learned latency tracker, grouped by client network (a /24 for
/// IPv4 clients, /48 for IPv6) and candidate region.
pub struct InMemoryLearnedLatencyProvider {
    entries: RwLock<HashMap<LearnedKey, LearnedEntry>>,
    min_samples: u32,
    stale_after: Duration,
    regions: Vec<&'static str>,
}

fn client_prefix(client: IpAddr) -> IpNetwork {
    let prefix_len = match client {
        IpAddr::V4(_) => 24,
        IpAddr::V6(_) => 48,
    };
    let full = IpNetwork::new(client, prefix_len).expect("prefix length is within address width");
    IpNetwork::new(full.network(), prefix_len).expect("network address keeps the same prefix length")
}

impl InMemoryLearnedLatencyProvider {
    pub fn new(min_samples: u32, stale_after: Duration, regions: Vec<&'static str>) -> Self {
        InMemoryLearnedLatencyProvider {
            entries: RwLock::new(HashMap::new()),
            min_samples,
            stale_after,
            regions,
        }
    }

    pub fn record_sample(&self, client: IpAddr, service: &'static str, region: &'static str, raw_ms: f64) {
        let key = LearnedKey {
            client_prefix: client_prefix(client),
            service_name: service,
            region,
        };

        let mut guard = self.entries.write();
        let entry = guard.entry(key).or_insert(LearnedEntry {
            smoothed_ms: raw_ms,
            sample_count: 0,
            last_updated: SystemTime::now(),
        });

        entry.smoothed_ms = if entry.sample_count == 0 {
            raw_ms
        } else {
            EWMA_ALPHA * raw_ms + (1.0 - EWMA_ALPHA) * entry.smoothed_ms
        };
        entry.sample_count += 1;
        entry.last_updated = SystemTime::now();
    }

    /// Drop entries that have not been refreshed within `stale_after`
    pub fn evict_stale(&self) {
        let stale_after = self.stale_after;
        self.entries.write().retain(|_, entry| {
            entry
                .last_updated
                .elapsed()
                .map(|age| age < stale_after)
                .unwrap_or(true)
        });
    }

    pub fn known_regions(&self) -> &[&'static str] {
        &self.regions
    }
}

impl LearnedLatencyProvider for InMemoryLearnedLatencyProvider {
    fn learned_latency_ms(&self, client: IpAddr, service: &str, region: &str) -> Option<f64> {
        let prefix = client_prefix(client);
        let guard = self.entries.read();
        let entry = guard.iter().find_map(|(key, entry)| {
            if key.client_prefix == prefix && key.service_name == service && key.region == region {
                Some(entry)
            } else {
                None
            }
        })?;

        if entry.sample_count < self.min_samples {
            return None;
        }
        if entry.last_updated.elapsed().map(|a| a >= self.stale_after).unwrap_or(false) {
            return None;
        }
        Some(entry.smoothed_ms)
    }
}
