//! Static latency routing
//!
//! Picks the backend with the lowest smoothed latency sample from
//! `latency::LatencyProvider`, among those within `max_latency_ms`. A
//! backend with no qualifying sample yet (below `min_samples`, per
//! `LatencyProvider`) is excluded rather than treated as a last resort: if
//! no backend has a qualifying sample at all, routing falls back to
//! round-robin over the full pool, matching the threshold-based latency
//! routers operators are used to from steering appliances.

use std::sync::Arc;

use crate::latency::LatencyProvider;
use crate::registry::Backend;
use crate::router::round_robin::RoundRobinRouter;
use crate::router::{Router, RouterContext};

pub struct LatencyRouter {
    provider: Arc<dyn LatencyProvider>,
    max_latency_ms: f64,
    fallback: RoundRobinRouter,
}

impl LatencyRouter {
    pub fn new(provider: Arc<dyn LatencyProvider>, max_latency_ms: f64) -> Self {
        LatencyRouter {
            provider,
            max_latency_ms,
            fallback: RoundRobinRouter::new(),
        }
    }

    fn latency_of(&self, backend: &Backend) -> Option<f64> {
        self.provider.latency_ms(backend.address, backend.port)
    }
}

impl Router for LatencyRouter {
    fn select<'a>(&self, backends: &'a [Backend], ctx: &RouterContext) -> Option<&'a Backend> {
        let qualifying: Vec<&Backend> = backends
            .iter()
            .filter(|b| self.latency_of(b).is_some())
            .collect();

        if qualifying.is_empty() {
            return self.fallback.select(backends, ctx);
        }

        let under_threshold: Vec<&Backend> = qualifying
            .iter()
            .copied()
            .filter(|b| self.latency_of(b).unwrap() <= self.max_latency_ms)
            .collect();

        let candidates = if under_threshold.is_empty() {
            log::warn!(
                "all qualifying backends for service {} exceed max_latency_ms {}, ignoring threshold",
                ctx.service_name, self.max_latency_ms
            );
            qualifying
        } else {
            under_threshold
        };

        candidates
            .into_iter()
            .min_by(|a, b| {
                let latency_a = self.latency_of(a).unwrap();
                let latency_b = self.latency_of(b).unwrap();
                latency_a.partial_cmp(&latency_b).unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::InMemoryLatencyProvider;
    use std::net::{IpAddr, Ipv4Addr};

    fn ctx<'a>() -> RouterContext<'a> {
        RouterContext {
            service_name: "svc",
            client_ip: None,
            client_region: None,
        }
    }

    #[test]
    fn prefers_lowest_latency_backend() {
        let provider = Arc::new(InMemoryLatencyProvider::new(1));
        let b1 = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80);
        let b2 = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80);
        provider.record_sample(b1.address, b1.port, 80.0);
        provider.record_sample(b2.address, b2.port, 20.0);

        let router = LatencyRouter::new(provider, 500.0);
        let pool = vec![b1, b2.clone()];
        assert_eq!(router.select(&pool, &ctx()), Some(&b2));
    }

    #[test]
    fn no_qualifying_backend_falls_back_to_round_robin() {
        let provider = Arc::new(InMemoryLatencyProvider::new(1));
        let b1 = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80);
        let b2 = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80);

        let router = LatencyRouter::new(provider, 500.0);
        let pool = vec![b1.clone(), b2.clone()];
        assert_eq!(router.select(&pool, &ctx()), Some(&b1));
        assert_eq!(router.select(&pool, &ctx()), Some(&b2));
    }

    #[test]
    fn all_above_threshold_ignores_threshold_and_uses_full_qualifying_set() {
        let provider = Arc::new(InMemoryLatencyProvider::new(1));
        let b1 = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80);
        let b2 = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80);
        provider.record_sample(b1.address, b1.port, 900.0);
        provider.record_sample(b2.address, b2.port, 700.0);

        let router = LatencyRouter::new(provider, 500.0);
        let pool = vec![b1, b2.clone()];
        assert_eq!(router.select(&pool, &ctx()), Some(&b2));
    }
}
