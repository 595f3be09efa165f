//! Benchmarks for history page decoding
//!
//! A full page is 1024 bytes and is decoded once per download, so the walk
//! should stay well under the radio round trip.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use pumplink::history::date::parse_date;
use pumplink::history::{lookup, parse_page};
use pumplink::test_utils::sample_page;
use std::hint::black_box;

/// Repeat the sample records until the buffer is one full page.
fn full_page() -> Vec<u8> {
    let sample = sample_page();
    // Drop the sample's partial tail so repeats stay aligned.
    let records = &sample[..sample.len() - 2];
    records.iter().copied().cycle().take(1024).collect()
}

fn bench_parse_page(c: &mut Criterion) {
    let page = full_page();

    let mut group = c.benchmark_group("parse_page");
    group.throughput(Throughput::Bytes(page.len() as u64));

    group.bench_function("smaller_model", |b| {
        b.iter(|| parse_page(black_box(&page), false));
    });

    group.bench_function("larger_model", |b| {
        b.iter(|| parse_page(black_box(&page), true));
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    c.bench_function("lookup_every_opcode", |b| {
        b.iter(|| {
            for opcode in 0..=u8::MAX {
                black_box(lookup(black_box(opcode), true));
            }
        });
    });
}

fn bench_parse_date(c: &mut Criterion) {
    let date = [0x6f, 0xd7, 0x08, 0x01, 0x06];
    c.bench_function("parse_date", |b| {
        b.iter(|| parse_date(black_box(&date)));
    });
}

criterion_group!(benches, bench_parse_page, bench_lookup, bench_parse_date);
criterion_main!(benches);
