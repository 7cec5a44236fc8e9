//! Failover (active/standby) routing
//!
//! Always returns the first backend in the configured pool order; since the
//! pool handed to routers is already filtered to healthy backends, this
//! naturally falls through to the next-highest-priority backend once the
//! active one goes unhealthy.

use crate::registry::Backend;
use crate::router::{Router, RouterContext};

pub struct FailoverRouter;

impl FailoverRouter {
    pub fn new() -> Self {
        FailoverRouter
    }
}

impl Default for FailoverRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for FailoverRouter {
    fn select<'a>(&self, backends: &'a [Backend], _ctx: &RouterContext) -> Option<&'a Backend> {
        backends.first()
    }
}
