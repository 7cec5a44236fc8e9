//! Routing algorithm implementations
//!
//! Each algorithm implements `Router` and is selected purely by the name
//! stored on a `registry::ServiceEntry`; `factory::make_router` is the
//! single place that maps algorithm names to implementations.
//!
//! Routers only ever see a pool that has already been filtered to healthy
//! backends by `handler::QueryHandler` — an empty pool never reaches a
//! router, it short-circuits to SERVFAIL before dispatch.

pub mod factory;
pub mod failover;
pub mod geolocation;
pub mod latency;
pub mod learned_latency;
pub mod round_robin;
pub mod weighted;

use std::net::IpAddr;

use crate::registry::Backend;

/// Per-query context a router may use to make its decision
pub struct RouterContext<'a> {
    pub service_name: &'a str,
    pub client_ip: Option<IpAddr>,
    pub client_region: Option<&'a str>,
}

/// A routing algorithm: picks one backend out of an already health-filtered,
/// non-empty pool.
pub trait Router: Send + Sync {
    fn select<'a>(&self, backends: &'a [Backend], ctx: &RouterContext) -> Option<&'a Backend>;
}

pub use factory::make_router;
