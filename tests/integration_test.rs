//! Integration tests for the GSLB DNS core
//!
//! These exercise the registry, health view, geo resolver and router
//! factory wired together through `QueryHandler`, the way the teacher's
//! integration tests exercise `ServerContext` and `execute_query` together.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use gslb_core::dns::health::InMemoryHealthView;
use gslb_core::dns::protocol::{DnsPacket, DnsQuestion, QueryType, ResultCode};
use gslb_core::geo::{CidrTrie, GeoResolver, RegionConfig};
use gslb_core::handler::QueryHandler;
use gslb_core::latency::InMemoryLatencyProvider;
use gslb_core::learned_latency::InMemoryLearnedLatencyProvider;
use gslb_core::registry::{Backend, Registry, ServiceEntry};

fn query_for(name: &str, qtype: QueryType) -> DnsPacket {
    let mut packet = DnsPacket::new();
    packet.header.id = 7;
    packet.questions.push(DnsQuestion::new(name.to_string(), qtype));
    packet
}

#[test]
fn failover_falls_through_to_next_backend_when_primary_is_unhealthy() {
    let registry = Arc::new(Registry::new());
    let mut entry = ServiceEntry::new("web.example.com", "failover");
    let primary = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80);
    let standby = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80);
    entry.backends.push(primary.clone());
    entry.backends.push(standby.clone());
    registry.register(entry);

    let health_view = Arc::new(InMemoryHealthView::new());
    health_view.set_healthy(primary.address, primary.port, false);

    let handler = QueryHandler::new(
        registry,
        Arc::new(GeoResolver::new(CidrTrie::new(), None, RegionConfig::new())),
        health_view,
        Arc::new(InMemoryLatencyProvider::new(1)),
        Arc::new(InMemoryLearnedLatencyProvider::new(
            1,
            std::time::Duration::from_secs(3600),
            vec![],
        )),
        60,
        4096,
        500.0,
        500.0,
    );

    let response = handler.handle_query(
        &query_for("web.example.com", QueryType::A),
        IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    );

    assert_eq!(response.header.rescode, ResultCode::NOERROR);
    match &response.answers[0] {
        gslb_core::dns::protocol::DnsRecord::A { addr, .. } => assert_eq!(*addr, standby.address),
        _ => panic!("expected an A record"),
    }
}

#[test]
fn geolocation_prefers_matching_region_override() {
    let registry = Arc::new(Registry::new());
    let mut entry = ServiceEntry::new("web.example.com", "geolocation");
    let eu_backend = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 1, 1)), 80).with_region("eu-west");
    let us_backend = Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 2, 1)), 80).with_region("us-east");
    entry.backends.push(eu_backend.clone());
    entry.backends.push(us_backend.clone());
    registry.register(entry);

    let mut overrides = CidrTrie::new();
    overrides.insert("203.0.113.0/24".parse().unwrap(), "eu-west");

    let handler = QueryHandler::new(
        registry,
        Arc::new(GeoResolver::new(overrides, None, RegionConfig::new())),
        Arc::new(InMemoryHealthView::new()),
        Arc::new(InMemoryLatencyProvider::new(1)),
        Arc::new(InMemoryLearnedLatencyProvider::new(
            1,
            std::time::Duration::from_secs(3600),
            vec![],
        )),
        60,
        4096,
        500.0,
        500.0,
    );

    let response = handler.handle_query(
        &query_for("web.example.com", QueryType::A),
        IpAddr::V4(Ipv4Addr::new(203, 0, 113, 42)),
    );

    match &response.answers[0] {
        gslb_core::dns::protocol::DnsRecord::A { addr, .. } => assert_eq!(*addr, eu_backend.address),
        _ => panic!("expected an A record"),
    }
}

#[test]
fn aaaa_query_only_considers_ipv6_backends() {
    let registry = Arc::new(Registry::new());
    let mut entry = ServiceEntry::new("dual.example.com", "round-robin");
    entry
        .backends
        .push(Backend::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80));
    entry
        .backends
        .push(Backend::new("2001:db8::1".parse().unwrap(), 80));
    registry.register(entry);

    let handler = QueryHandler::new(
        registry,
        Arc::new(GeoResolver::new(CidrTrie::new(), None, RegionConfig::new())),
        Arc::new(InMemoryHealthView::new()),
        Arc::new(InMemoryLatencyProvider::new(1)),
        Arc::new(InMemoryLearnedLatencyProvider::new(
            1,
            std::time::Duration::from_secs(3600),
            vec![],
        )),
        60,
        4096,
        500.0,
        500.0,
    );

    let response = handler.handle_query(
        &query_for("dual.example.com", QueryType::Aaaa),
        IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    );

    assert_eq!(response.answers.len(), 1);
    assert!(matches!(
        response.answers[0],
        gslb_core::dns::protocol::DnsRecord::Aaaa { .. }
    ));
}
