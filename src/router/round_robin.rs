//! Round-robin routing
//!
//! Cycles through a service's backend pool in order, one counter per
//! service name. Grounded on the teacher's `DnsResolver` round-robin
//! address rotation in `protocol::DnsPacket::get_random_a`'s sibling
//! behavior, generalized from "random A record" to "next backend in line"
//! with explicit per-service state instead of relying on RNG.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::registry::Backend;
use crate::router::{Router, RouterContext};

pub struct RoundRobinRouter {
    counters: RwLock<HashMap<String, AtomicUsize>>,
}

impl RoundRobinRouter {
    pub fn new() -> Self {
        RoundRobinRouter {
            counters: RwLock::new(HashMap::new()),
        }
    }

    fn next_index(&self, service_name: &str, len: usize) -> usize {
        let guard = self.counters.read();
        if let Some(counter) = guard.get(service_name) {
            return counter.fetch_add(1, Ordering::Relaxed) % len;
        }
        drop(guard);

        let mut guard = self.counters.write();
        let counter = guard
            .entry(service_name.to_string())
            .or_insert_with(|| AtomicUsize::new(0));
        counter.fetch_add(1, Ordering::Relaxed) % len
    }
}

impl Default for RoundRobinRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for RoundRobinRouter {
    fn select<'a>(&self, backends: &'a [Backend], ctx: &RouterContext) -> Option<&'a Backend> {
        if backends.is_empty() {
            return None;
        }
        let idx = self.next_index(ctx.service_name, backends.len());
        backends.get(idx)
    }
}
