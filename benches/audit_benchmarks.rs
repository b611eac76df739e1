//! Performance benchmarks for the audit and pairing paths
//!
//! Targets:
//! - Gap detection: <5ms for 10k ids
//! - Stats summary: <20ms for 5k documents
//! - Pairing detection: <1ms over a 2k-record cycle

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use msh3_core::stats::{find_gaps, summarize};
use msh3_core::storage::test_utils::{cycle, AssessmentBuilder};
use msh3_core::{compute_scores, detect_pairing, Assessment, Document, UserId};
use std::collections::BTreeSet;

const CYCLE: &str = "2025-03";

/// Every seventh id missing
fn sparse_ids(max: u64) -> BTreeSet<u64> {
    (1..=max).filter(|n| n % 7 != 0).collect()
}

fn population(size: usize) -> Vec<Assessment> {
    (0..size)
        .map(|i| {
            let subject = format!("u{}", i / 4);
            let builder = match i % 4 {
                0 => AssessmentBuilder::self_assessment(&subject, CYCLE),
                _ => AssessmentBuilder::bilateral(&subject, &format!("m{}", i % 13), CYCLE),
            };
            builder
                .msh(i as u64 + 1)
                .scores([(2, 1), (1, 1), (2, 2)])
                .completed()
                .build()
        })
        .collect()
}

fn bench_find_gaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_gaps");
    for max in [1_000u64, 10_000] {
        let ids = sparse_ids(max);
        group.throughput(Throughput::Elements(max));
        group.bench_with_input(BenchmarkId::from_parameter(max), &ids, |b, ids| {
            b.iter(|| find_gaps(black_box(ids)))
        });
    }
    group.finish();
}

fn bench_summarize(c: &mut Criterion) {
    let documents: Vec<Document> = population(5_000)
        .iter()
        .map(|a| Document::new(a.id.as_str(), serde_json::to_value(a).unwrap()))
        .collect();

    c.bench_function("summarize_5k", |b| {
        b.iter(|| summarize(black_box(&documents), black_box(5_000)))
    });
}

fn bench_detect_pairing(c: &mut Criterion) {
    let assessments = population(2_000);
    let manager = UserId::from("m3");
    let report = UserId::from("u42");

    c.bench_function("detect_pairing_2k", |b| {
        b.iter(|| {
            detect_pairing(
                black_box(&assessments),
                black_box(&manager),
                black_box(&report),
                cycle(CYCLE),
            )
        })
    });
}

fn bench_compute_scores(c: &mut Criterion) {
    let scores = population(1)[0].scores;
    c.bench_function("compute_scores", |b| b.iter(|| compute_scores(black_box(&scores))));
}

criterion_group!(
    benches,
    bench_find_gaps,
    bench_summarize,
    bench_detect_pairing,
    bench_compute_scores
);
criterion_main!(benches);
