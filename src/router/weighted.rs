//! Weighted-random routing
//!
//! Selects a backend with probability proportional to its configured
//! weight, using the teacher's `rand` dependency the same way
//! `protocol::DnsPacket::get_random_a` picks a random A record, generalized
//! from uniform to weighted selection.

use rand::Rng;

use crate::registry::Backend;
use crate::router::{Router, RouterContext};

pub struct WeightedRouter;

impl WeightedRouter {
    pub fn new() -> Self {
        WeightedRouter
    }
}

impl Default for WeightedRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for WeightedRouter {
    fn select<'a>(&self, backends: &'a [Backend], _ctx: &RouterContext) -> Option<&'a Backend> {
        if backends.is_empty() {
            return None;
        }

        let total: u32 = backends.iter().map(|b| b.weight.max(1)).sum();
        if total == 0 {
            return backends.first();
        }

        let mut pick = rand::thread_rng().gen_range(0, total);
        for backend in backends {
            let weight = backend.weight.max(1);
            if pick < weight {
                return Some(backend);
            }
            pick -= weight;
        }

        backends.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn ctx<'a>() -> RouterContext<'a> {
        RouterContext {
            service_name: "svc",
            client_ip: None,
            client_region: None,
        }
    }

    #[test]
    fn single_backend_is_always_selected() {
        let router = WeightedRouter::new();
        let pool = vec![Backend::new(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            80,
        )];
        assert_eq!(router.select(&pool, &ctx()), Some(&pool[0]));
    }

    #[test]
    fn zero_weight_backend_is_still_eligible_with_floor() {
        let router = WeightedRouter::new();
        let pool = vec![
            Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80).with_weight(0),
            Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80).with_weight(0),
        ];
        assert!(router.select(&pool, &ctx()).is_some());
    }
}
