//! Query handling pipeline
//!
//! Ties the wire protocol to the registry, health view, geo resolver and
//! router factory: parse -> classify -> lookup -> filter -> route -> answer.
//! Grounded on the teacher's `server::process_valid_query` /
//! `resolve_question` / `populate_packet_from_results` pipeline, replacing
//! its cache-then-resolve-then-cache flow with registry lookup, health
//! filtering and algorithmic routing.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::dns::edns::EdnsProcessor;
use crate::dns::errors::GslbError;
use crate::dns::health::HealthView;
use crate::dns::protocol::{DnsPacket, DnsRecord, QueryType, ResultCode, TransientTtl};
use crate::geo::GeoResolver;
use crate::latency::LatencyProvider;
use crate::learned_latency::LearnedLatencyProvider;
use crate::registry::{Backend, Registry};
use crate::router::{self, Router, RouterContext};

pub struct QueryHandler {
    registry: Arc<Registry>,
    geo_resolver: Arc<GeoResolver>,
    health_view: Arc<dyn HealthView>,
    latency_provider: Arc<dyn LatencyProvider>,
    learned_latency_provider: Arc<dyn LearnedLatencyProvider>,
    routers: RwLock<HashMap<String, Arc<dyn Router>>>,
    default_ttl_seconds: u32,
    edns_udp_size: u16,
    latency_max_latency_ms: f64,
    learned_latency_max_latency_ms: f64,
}

impl QueryHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<Registry>,
        geo_resolver: Arc<GeoResolver>,
        health_view: Arc<dyn HealthView>,
        latency_provider: Arc<dyn LatencyProvider>,
        learned_latency_provider: Arc<dyn LearnedLatencyProvider>,
        default_ttl_seconds: u32,
        edns_udp_size: u16,
        latency_max_latency_ms: f64,
        learned_latency_max_latency_ms: f64,
    ) -> Self {
        QueryHandler {
            registry,
            geo_resolver,
            health_view,
            latency_provider,
            learned_latency_provider,
            routers: RwLock::new(HashMap::new()),
            default_ttl_seconds,
            edns_udp_size,
            latency_max_latency_ms,
            learned_latency_max_latency_ms,
        }
    }

    /// Routers are stateful (round-robin counters, etc.) so one is kept per
    /// algorithm name for the handler's lifetime rather than rebuilt per
    /// query.
    fn router_for(&self, algorithm: &str) -> Result<Arc<dyn Router>, GslbError> {
        if let Some(router) = self.routers.read().get(algorithm) {
            return Ok(router.clone());
        }

        let router = router::make_router(
            algorithm,
            &self.latency_provider,
            &self.learned_latency_provider,
            self.latency_max_latency_ms,
            self.learned_latency_max_latency_ms,
        )?;
        self.routers
            .write()
            .insert(algorithm.to_string(), router.clone());
        Ok(router)
    }

    /// Handle one incoming request, returning the response packet
    pub fn handle_query(&self, request: &DnsPacket, client_ip: IpAddr) -> DnsPacket {
        let mut response = DnsPacket::new();
        response.header.id = request.header.id;
        response.header.recursion_desired = request.header.recursion_desired;
        response.header.recursion_available = false;
        response.header.response = true;
        response.header.authoritative_answer = true;

        let incoming_edns = EdnsProcessor::process_incoming(&request.resources);
        if let Some(ref edns) = incoming_edns {
            response.resources.push(edns.to_opt_record());
        }

        let question = match request.questions.first() {
            Some(q) => q.clone(),
            None => {
                response.header.rescode = ResultCode::FORMERR;
                return response;
            }
        };
        response.questions.push(question.clone());

        let effective_client = incoming_edns
            .as_ref()
            .and_then(EdnsProcessor::handle_client_subnet)
            .unwrap_or(client_ip);

        if !matches!(question.qtype, QueryType::A | QueryType::Aaaa) {
            response.header.rescode = ResultCode::NOTIMP;
            return response;
        }

        let service = match self.registry.lookup(&question.name) {
            Some(service) => service,
            None => {
                response.header.rescode = ResultCode::NXDOMAIN;
                return response;
            }
        };

        let wants_v4 = question.qtype == QueryType::A;
        let eligible: Vec<Backend> = service
            .backends
            .iter()
            .filter(|b| matches!(b.address, IpAddr::V4(_)) == wants_v4)
            .filter(|b| self.health_view.is_healthy(b.address, b.port))
            .cloned()
            .collect();

        if eligible.is_empty() {
            response.header.rescode = ResultCode::SERVFAIL;
            return response;
        }

        let client_region = self.geo_resolver.resolve(effective_client);
        let router = match self.router_for(&service.algorithm) {
            Ok(router) => router,
            Err(_) => {
                response.header.rescode = ResultCode::SERVFAIL;
                return response;
            }
        };

        let router_ctx = RouterContext {
            service_name: &service.name,
            client_ip: Some(effective_client),
            client_region: client_region.as_deref(),
        };

        let selected = match router.select(&eligible, &router_ctx) {
            Some(backend) => backend,
            None => {
                response.header.rescode = ResultCode::SERVFAIL;
                return response;
            }
        };

        let ttl = TransientTtl(service.ttl_seconds.unwrap_or(self.default_ttl_seconds));
        let answer = match selected.address {
            IpAddr::V4(addr) => DnsRecord::A {
                domain: question.name.clone(),
                addr,
                ttl,
            },
            IpAddr::V6(addr) => DnsRecord::Aaaa {
                domain: question.name.clone(),
                addr,
                ttl,
            },
        };
        response.answers.push(answer);

        response
    }

    pub fn edns_udp_size(&self) -> u16 {
        self.edns_udp_size
    }
}
