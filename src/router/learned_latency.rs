//! Learned-latency routing
//!
//! Same selection rule as `router::latency::LatencyRouter`, but consults
//! `learned_latency::LearnedLatencyProvider`, keyed by the querying client's
//! network prefix, the service name and a candidate backend's region rather
//! than by active probes. Falls back to round-robin over the full pool when
//! there is no client IP, or when no backend has a qualifying measurement.

use std::sync::Arc;

use crate::learned_latency::LearnedLatencyProvider;
use crate::registry::Backend;
use crate::router::round_robin::RoundRobinRouter;
use crate::router::{Router, RouterContext};

pub struct LearnedLatencyRouter {
    provider: Arc<dyn LearnedLatencyProvider>,
    max_latency_ms: f64,
    fallback: RoundRobinRouter,
}

impl LearnedLatencyRouter {
    pub fn new(provider: Arc<dyn LearnedLatencyProvider>, max_latency_ms: f64) -> Self {
        LearnedLatencyRouter {
            provider,
            max_latency_ms,
            fallback: RoundRobinRouter::new(),
        }
    }
}

impl Router for LearnedLatencyRouter {
    fn select<'a>(&self, backends: &'a [Backend], ctx: &RouterContext) -> Option<&'a Backend> {
        let client = match ctx.client_ip {
            Some(ip) => ip,
            None => return self.fallback.select(backends, ctx),
        };

        let latency_of = |b: &Backend| -> Option<f64> {
            let region = b.region.as_deref()?;
            if region.is_empty() {
                return None;
            }
            self.provider.learned_latency_ms(client, ctx.service_name, region)
        };

        let qualifying: Vec<&Backend> = backends.iter().filter(|b| latency_of(b).is_some()).collect();

        if qualifying.is_empty() {
            return self.fallback.select(backends, ctx);
        }

        let under_threshold: Vec<&Backend> = qualifying
            .iter()
            .copied()
            .filter(|b| latency_of(b).unwrap() <= self.max_latency_ms)
            .collect();

        let candidates = if under_threshold.is_empty() {
            log::warn!(
                "all qualifying backends for service {} exceed learned max_latency_ms {}, ignoring threshold",
                ctx.service_name, self.max_latency_ms
            );
            qualifying
        } else {
            under_threshold
        };

        candidates.into_iter().min_by(|a, b| {
            let latency_a = latency_of(a).unwrap();
            let latency_b = latency_of(b).unwrap();
            latency_a.partial_cmp(&latency_b).unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learned_latency::InMemoryLearnedLatencyProvider;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    #[test]
    fn prefers_backend_with_lower_learned_latency() {
        let provider = Arc::new(InMemoryLearnedLatencyProvider::new(
            1,
            Duration::from_secs(3600),
            vec!["us-east", "eu-west"],
        ));
        let client = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 1));
        provider.record_sample(client, "svc", "us-east", 90.0);
        provider.record_sample(client, "svc", "eu-west", 15.0);

        let east = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80).with_region("us-east");
        let west = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80).with_region("eu-west");

        let router = LearnedLatencyRouter::new(provider, 500.0);
        let ctx = RouterContext {
            service_name: "svc",
            client_ip: Some(client),
            client_region: None,
        };
        let pool = vec![east, west.clone()];
        assert_eq!(router.select(&pool, &ctx), Some(&west));
    }

    #[test]
    fn different_service_measurements_do_not_collide() {
        let provider = Arc::new(InMemoryLearnedLatencyProvider::new(
            1,
            Duration::from_secs(3600),
            vec!["us-east"],
        ));
        let client = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 1));
        provider.record_sample(client, "other-service", "us-east", 5.0);

        let backend = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80).with_region("us-east");

        let router = LearnedLatencyRouter::new(provider, 500.0);
        let ctx = RouterContext {
            service_name: "svc",
            client_ip: Some(client),
            client_region: None,
        };
        let pool = vec![backend.clone()];
        // no measurement recorded for "svc" with this region, falls back to round-robin
        assert_eq!(router.select(&pool, &ctx), Some(&backend));
    }

    #[test]
    fn no_client_ip_falls_back_to_round_robin() {
        let provider = Arc::new(InMemoryLearnedLatencyProvider::new(
            1,
            Duration::from_secs(3600),
            vec!["us-east"],
        ));
        let b1 = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80);
        let b2 = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80);
        let router = LearnedLatencyRouter::new(provider, 500.0);
        let ctx = RouterContext {
            service_name: "svc",
            client_ip: None,
            client_region: None,
        };
        let pool = vec![b1.clone(), b2.clone()];
        assert_eq!(router.select(&pool, &ctx), Some(&b1));
        assert_eq!(router.select(&pool, &ctx), Some(&b2));
    }

    #[test]
    fn all_above_threshold_ignores_threshold_and_uses_full_qualifying_set() {
        let provider = Arc::new(InMemoryLearnedLatencyProvider::new(
            1,
            Duration::from_secs(3600),
            vec!["us-east", "eu-west"],
        ));
        let client = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 1));
        provider.record_sample(client, "svc", "us-east", 900.0);
        provider.record_sample(client, "svc", "eu-west", 700.0);

        let east = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80).with_region("us-east");
        let west = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80).with_region("eu-west");

        let router = LearnedLatencyRouter::new(provider, 500.0);
        let ctx = RouterContext {
            service_name: "svc",
            client_ip: Some(client),
            client_region: None,
        };
        let pool = vec![east, west.clone()];
        assert_eq!(router.select(&pool, &ctx), Some(&west));
    }
}
