//! Server context: shared, read-mostly state handed to every worker thread

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use derive_more::{Display, Error, From};

use crate::config::Config;
use crate::dns::errors::GslbError;
use crate::dns::health::{HealthView, InMemoryHealthView};
use crate::geo::{CidrTrie, GeoDatabase, GeoResolver, MaxMindGeoDatabase, RegionConfig};
use crate::handler::QueryHandler;
use crate::latency::{InMemoryLatencyProvider, LatencyProvider};
use crate::learned_latency::{InMemoryLearnedLatencyProvider, LearnedLatencyProvider};
use crate::registry::Registry;

#[derive(Debug, Display, From, Error)]
pub enum ContextError {
    Geo(crate::geo::GeoDatabaseError),
    Gslb(GslbError),
}

type Result<T> = std::result::Result<T, ContextError>;

pub struct ServerStatistics {
    pub tcp_query_count: AtomicUsize,
    pub udp_query_count: AtomicUsize,
}

impl ServerStatistics {
    pub fn get_tcp_query_count(&self) -> usize {
        self.tcp_query_count.load(Ordering::Acquire)
    }

    pub fn get_udp_query_count(&self) -> usize {
        self.udp_query_count.load(Ordering::Acquire)
    }
}

impl Default for ServerStatistics {
    fn default() -> Self {
        ServerStatistics {
            tcp_query_count: AtomicUsize::new(0),
            udp_query_count: AtomicUsize::new(0),
        }
    }
}

/// Main server context containing configuration and shared state
///
/// Holds the registry, geo resolver, health view and latency providers the
/// query handler consults, plus the DNS port and EDNS UDP size transport
/// needs on every request.
pub struct ServerContext {
    pub config: Config,
    pub registry: Arc<Registry>,
    pub health_view: Arc<dyn HealthView>,
    pub latency_provider: Arc<dyn LatencyProvider>,
    pub learned_latency_provider: Arc<dyn LearnedLatencyProvider>,
    pub handler: QueryHandler,
    pub statistics: ServerStatistics,
}

impl ServerContext {
    pub fn new(config: Config) -> Result<ServerContext> {
        let registry = Arc::new(Registry::new());
        let health_view: Arc<dyn HealthView> = Arc::new(InMemoryHealthView::new());
        let latency_provider: Arc<dyn LatencyProvider> = Arc::new(InMemoryLatencyProvider::new(
            config.latency.min_samples,
        ));
        let learned_latency_provider: Arc<dyn LearnedLatencyProvider> =
            Arc::new(InMemoryLearnedLatencyProvider::new(
                config.learned_latency.min_samples,
                std::time::Duration::from_secs(config.learned_latency.stale_threshold_hours * 3600),
                Vec::new(),
            ));

        let database: Option<Box<dyn GeoDatabase>> = match &config.geoip_database_path {
            Some(path) => Some(Box::new(MaxMindGeoDatabase::open(path)?)),
            None => None,
        };

        let mut regions = RegionConfig::new();
        regions.default_region = config.default_region.clone();

        let geo_resolver = Arc::new(GeoResolver::new(CidrTrie::new(), database, regions));

        let handler = QueryHandler::new(
            registry.clone(),
            geo_resolver,
            health_view.clone(),
            latency_provider.clone(),
            learned_latency_provider.clone(),
            config.default_ttl_seconds,
            config.edns_udp_size,
            config.latency.max_latency_ms,
            config.learned_latency.max_latency_ms,
        );

        Ok(ServerContext {
            config,
            registry,
            health_view,
            latency_provider,
            learned_latency_provider,
            handler,
            statistics: ServerStatistics::default(),
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn create_test_context() -> Arc<ServerContext> {
        Arc::new(ServerContext::new(Config::default()).expect("test context should construct"))
    }
}
