//! Routing algorithm name resolution
//!
//! The single place a service's configured algorithm name turns into a
//! `Router` instance. Aliases exist so config authors can write either the
//! long form or a common shorthand.

use std::sync::Arc;

use crate::dns::errors::GslbError;
use crate::latency::LatencyProvider;
use crate::learned_latency::LearnedLatencyProvider;
use crate::router::{
    failover::FailoverRouter, geolocation::GeolocationRouter, latency::LatencyRouter,
    learned_latency::LearnedLatencyRouter, round_robin::RoundRobinRouter, weighted::WeightedRouter,
    Router,
};

/// Build a `Router` for an algorithm name, or `GslbError::UnknownAlgorithm`
/// if the name is not recognized. `latency_max_latency_ms` and
/// `learned_latency_max_latency_ms` are the respective `max_latency_ms`
/// thresholds from configuration.
pub fn make_router(
    algorithm: &str,
    latency_provider: &Arc<dyn LatencyProvider>,
    learned_latency_provider: &Arc<dyn LearnedLatencyProvider>,
    latency_max_latency_ms: f64,
    learned_latency_max_latency_ms: f64,
) -> Result<Arc<dyn Router>, GslbError> {
    match algorithm.to_lowercase().as_str() {
        "round-robin" | "roundrobin" | "rr" => Ok(Arc::new(RoundRobinRouter::new())),
        "weighted" | "weight" => Ok(Arc::new(WeightedRouter::new())),
        "failover" | "active-standby" | "activestandby" => Ok(Arc::new(FailoverRouter::new())),
        "geolocation" | "geo" => Ok(Arc::new(GeolocationRouter::new())),
        "latency" => Ok(Arc::new(LatencyRouter::new(
            latency_provider.clone(),
            latency_max_latency_ms,
        ))),
        "learned_latency" | "learned-latency" => Ok(Arc::new(LearnedLatencyRouter::new(
            learned_latency_provider.clone(),
            learned_latency_max_latency_ms,
        ))),
        other => Err(GslbError::UnknownAlgorithm(other.to_string())),
    }
}
