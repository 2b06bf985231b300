//! Benchmark suite for TradeKernel
//!
//! Run with: `cargo bench --package tradekernel`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use tradekernel::core::runtime::WorkerPool;
use tradekernel::temporal::{
    config::{AnalysisConfig, CycleConfig, MatcherConfig, RegimeConfig},
    cycles::CycleDetection,
    ensemble::EnsemblePredictor,
    matching::{dtw_distance, PatternMatcher},
    regime::RegimeDetector,
    types::ActivitySeries,
};

fn synthetic(n: usize, seed: u64) -> ActivitySeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..n)
        .map(|t| {
            let cycle = 20.0 * (2.0 * PI * t as f64 / 30.0).sin();
            let level = if (t / 120) % 2 == 0 { 80.0 } else { 140.0 };
            level + cycle + rng.gen::<f64>() * 10.0
        })
        .collect();
    ActivitySeries::daily(values)
}

// ============================================================================
// Detector Benchmarks
// ============================================================================

fn cycle_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("temporal/cycle-detection");
    let config = CycleConfig {
        n_surrogates: 50,
        ..CycleConfig::default()
    };
    let pool = WorkerPool::global();

    for size in [365, 1_095, 3_650] {
        let series = synthetic(size, 1);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("points", size), &series, |b, s| {
            b.iter(|| CycleDetection::compute(black_box(s), &config, 42, &pool))
        });
    }

    group.finish();
}

fn regime_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("regime/hmm-detection");
    let config = RegimeConfig::default();

    for size in [365, 1_095] {
        let series = synthetic(size, 2);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("points", size), &series, |b, s| {
            b.iter(|| RegimeDetector::analyze(&config, black_box(s)))
        });
    }

    group.finish();
}

fn matcher_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching/dtw-analogues");
    let config = MatcherConfig::default();
    let pool = WorkerPool::global();

    for size in [365, 1_095, 3_650] {
        let series = synthetic(size, 3);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("points", size), &series, |b, s| {
            b.iter(|| PatternMatcher::compute(black_box(s), &config, &pool))
        });
    }

    group.finish();
}

fn dtw_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching/dtw");
    let a: Vec<f64> = (0..30).map(|i| (i as f64 * 0.3).sin()).collect();
    let b: Vec<f64> = (0..30).map(|i| (i as f64 * 0.3 + 0.2).sin()).collect();

    for band in [1, 3, 30] {
        group.bench_with_input(BenchmarkId::new("band", band), &band, |bench, &band| {
            bench.iter(|| dtw_distance(black_box(&a), black_box(&b), band))
        });
    }

    group.finish();
}

// ============================================================================
// Ensemble Benchmarks
// ============================================================================

fn ensemble_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("ensemble/prediction");
    group.sample_size(10);
    let config = AnalysisConfig::testing();
    let pool = WorkerPool::global();

    for size in [730, 1_460] {
        let series = synthetic(size, 4);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("points", size), &series, |b, s| {
            b.iter(|| EnsemblePredictor::predict(black_box(s), &config, &pool))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    cycle_benchmark,
    regime_benchmark,
    matcher_benchmark,
    dtw_benchmark,
    ensemble_benchmark
);
criterion_main!(benches);
