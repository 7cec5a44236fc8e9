//! Performance benchmarks for DNS packet parsing and serialization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gslb_core::dns::buffer::{BytePacketBuffer, PacketBuffer, VectorPacketBuffer};
use gslb_core::dns::protocol::{DnsPacket, DnsQuestion, DnsRecord, QueryType, TransientTtl};
use std::net::Ipv4Addr;

fn packet_with_answers(count: usize) -> DnsPacket {
    let mut packet = DnsPacket::new();
    packet.header.id = 1337;
    packet.header.response = true;
    packet
        .questions
        .push(DnsQuestion::new("example.com".to_string(), QueryType::A));

    for i in 0..count {
        packet.answers.push(DnsRecord::A {
            domain: "example.com".to_string(),
            addr: Ipv4Addr::new(10, 0, (i / 256) as u8, (i % 256) as u8),
            ttl: TransientTtl(3600),
        });
    }

    packet
}

fn serialized_packet_buffer(count: usize) -> BytePacketBuffer {
    let mut packet = packet_with_answers(count);
    let mut buffer = BytePacketBuffer::new();
    packet.write(&mut buffer, 512).unwrap();
    buffer.pos = 0;
    buffer
}

fn benchmark_packet_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("DnsPacket::write");

    for count in [1usize, 4, 16].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let mut packet = packet_with_answers(count);
                let mut buffer = VectorPacketBuffer::new();
                black_box(packet.write(&mut buffer, 0xFFFF))
            });
        });
    }

    group.finish();
}

fn benchmark_packet_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("DnsPacket::from_buffer");
    group.throughput(Throughput::Elements(1));

    for count in [1usize, 4, 16].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let mut buffer = serialized_packet_buffer(count);
                black_box(DnsPacket::from_buffer(&mut buffer))
            });
        });
    }

    group.finish();
}

fn benchmark_qname_compression(c: &mut Criterion) {
    c.bench_function("read_qname with compression pointer", |b| {
        b.iter(|| {
            let mut buffer = VectorPacketBuffer::new();
            buffer.write_qname("www.example.com").unwrap();
            let pointer_pos = buffer.pos();
            buffer.write_u16(0xC000).unwrap();
            buffer.seek(pointer_pos).unwrap();

            let mut name = String::new();
            black_box(buffer.read_qname(&mut name))
        });
    });
}

criterion_group!(
    benches,
    benchmark_packet_write,
    benchmark_packet_parse,
    benchmark_qname_compression
);
criterion_main!(benches);
