//! Geolocation routing
//!
//! Round-robins within the subset of backends whose configured region
//! matches the client's resolved region (see `geo::GeoResolver`); falls
//! back to round-robin over the entire pool when there is no client IP, the
//! region could not be resolved, or no backend carries a matching region.
//! `geo::GeoResolver::resolve` already folds the configured default region
//! into its own precedence chain, so a client region that resolves to the
//! default and still matches no backend falls through to the full-pool
//! round-robin directly.

use crate::registry::Backend;
use crate::router::round_robin::RoundRobinRouter;
use crate::router::{Router, RouterContext};

pub struct GeolocationRouter {
    fallback: RoundRobinRouter,
}

impl GeolocationRouter {
    pub fn new() -> Self {
        GeolocationRouter {
            fallback: RoundRobinRouter::new(),
        }
    }
}

impl Default for GeolocationRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for GeolocationRouter {
    fn select<'a>(&self, backends: &'a [Backend], ctx: &RouterContext) -> Option<&'a Backend> {
        let region = match ctx.client_ip.and(ctx.client_region) {
            Some(region) => region,
            None => return self.fallback.select(backends, ctx),
        };

        let matched: Vec<Backend> = backends
            .iter()
            .filter(|b| b.region.as_deref() == Some(region))
            .cloned()
            .collect();

        if matched.is_empty() {
            return self.fallback.select(backends, ctx);
        }

        let idx = self.fallback.select(&matched, ctx).and_then(|picked| {
            backends.iter().position(|b| b == picked)
        });

        idx.and_then(|i| backends.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn backend(octet: u8, region: Option<&str>) -> Backend {
        let mut b = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, octet)), 80);
        if let Some(r) = region {
            b = b.with_region(r);
        }
        b
    }

    fn ctx_with<'a>(client_ip: Option<IpAddr>, region: Option<&'a str>) -> RouterContext<'a> {
        RouterContext {
            service_name: "svc",
            client_ip,
            client_region: region,
        }
    }

    #[test]
    fn matches_client_region_when_available() {
        let router = GeolocationRouter::new();
        let pool = vec![backend(1, Some("eu-west")), backend(2, Some("us-east"))];
        let ctx = ctx_with(Some(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))), Some("us-east"));
        assert_eq!(router.select(&pool, &ctx), Some(&pool[1]));
    }

    #[test]
    fn round_robins_within_matched_region_subset() {
        let router = GeolocationRouter::new();
        let pool = vec![
            backend(1, Some("us-east")),
            backend(2, Some("eu-west")),
            backend(3, Some("us-east")),
        ];
        let ctx = ctx_with(Some(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))), Some("us-east"));

        let first = router.select(&pool, &ctx).unwrap().clone();
        let second = router.select(&pool, &ctx).unwrap().clone();
        let third = router.select(&pool, &ctx).unwrap().clone();

        assert_eq!(first, pool[0]);
        assert_eq!(second, pool[2]);
        assert_eq!(third, pool[0]);
    }

    #[test]
    fn falls_back_to_full_pool_round_robin_when_no_region_matches() {
        let router = GeolocationRouter::new();
        let pool = vec![backend(1, Some("eu-west")), backend(2, Some("eu-west"))];
        let ctx = ctx_with(Some(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))), Some("us-east"));

        let first = router.select(&pool, &ctx).unwrap().clone();
        let second = router.select(&pool, &ctx).unwrap().clone();
        assert_eq!(first, pool[0]);
        assert_eq!(second, pool[1]);
    }

    #[test]
    fn no_client_ip_falls_back_to_full_pool_round_robin() {
        let router = GeolocationRouter::new();
        let pool = vec![backend(1, Some("eu-west")), backend(2, Some("us-east"))];
        let ctx = ctx_with(None, Some("us-east"));

        let first = router.select(&pool, &ctx).unwrap().clone();
        let second = router.select(&pool, &ctx).unwrap().clone();
        assert_eq!(first, pool[0]);
        assert_eq!(second, pool[1]);
    }
}
