//! Static per-backend latency tracking
//!
//! Grounded on the teacher's `HealthMonitor` EWMA smoothing for latency
//! percentiles (`health.rs` in the pristine teacher tree), narrowed from a
//! whole-server metric to a per-backend one keyed by address and port, the
//! same way `health::InMemoryHealthView` narrows health down from
//! server-wide to per-backend.

use std::collections::HashMap;
use std::net::IpAddr;

use parking_lot::RwLock;

/// Smoothing factor for the exponentially weighted moving average. Higher
/// weights recent samples more heavily.
const EWMA_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
struct LatencyEntry {
    smoothed_ms: f64,
    sample_count: u32,
}

/// Read side of latency tracking, consulted by the latency router
pub trait LatencyProvider: Send + Sync {
    /// Smoothed latency in milliseconds, if enough samples have been seen
    fn latency_ms(&self, address: IpAddr, port: u16) -> Option<f64>;
}

/// In-memory EWMA latency tracker
pub struct InMemoryLatencyProvider {
    entries: RwLock<HashMap<(IpAddr, u16), LatencyEntry>>,
    min_samples: u32,
}

impl InMemoryLatencyProvider {
    pub fn new(min_samples: u32) -> Self {
        InMemoryLatencyProvider {
            entries: RwLock::new(HashMap::new()),
            min_samples,
        }
    }

    /// Record a fresh raw latency sample for a backend
    pub fn record_sample(&self, address: IpAddr, port: u16, raw_ms: f64) {
        let mut guard = self.entries.write();
        let entry = guard.entry((address, port)).or_insert(LatencyEntry {
            smoothed_ms: raw_ms,
            sample_count: 0,
        });

        if entry.sample_count == 0 {
            entry.smoothed_ms = raw_ms;
        } else {
            entry.smoothed_ms = EWMA_ALPHA * raw_ms + (1.0 - EWMA_ALPHA) * entry.smoothed_ms;
        }
        entry.sample_count += 1;
    }

    pub fn remove(&self, address: IpAddr, port: u16) {
        self.entries.write().remove(&(address, port));
    }
}

impl LatencyProvider for InMemoryLatencyProvider {
    fn latency_ms(&self, address: IpAddr, port: u16) -> Option<f64> {
        let guard = self.entries.read();
        let entry = guard.get(&(address, port))?;
        if entry.sample_count < self.min_samples {
            return None;
        }
        Some(entry.smoothed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
    }

    #[test]
    fn below_min_samples_returns_none() {
        let provider = InMemoryLatencyProvider::new(3);
        provider.record_sample(addr(), 80, 10.0);
        assert_eq!(provider.latency_ms(addr(), 80), None);
    }

    #[test]
    fn smooths_toward_recent_samples() {
        let provider = InMemoryLatencyProvider::new(1);
        provider.record_sample(addr(), 80, 100.0);
        provider.record_sample(addr(), 80, 10.0);

        let smoothed = provider.latency_ms(addr(), 80).unwrap();
        assert!(smoothed < 100.0 && smoothed > 10.0);
    }

    #[test]
    fn unknown_backend_has_no_latency() {
        let provider = InMemoryLatencyProvider::new(1);
        assert_eq!(provider.latency_ms(addr(), 80), None);
    }
}
