//! Criterion micro-benchmarks for diagnostic reductions, serial and parallel.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use shoal_core::Trigger;
use shoal_diagnostics::{advective_cfl, divergence, HorizontalAverage, NaNChecker};
use shoal_field::Backend;
use shoal_bench::{reference_profile, seeded_model};
use shoal_model::Model;

const BACKENDS: [Backend; 2] = [Backend::Serial, Backend::Parallel];

fn model(backend: Backend) -> Model {
    seeded_model(reference_profile(backend).unwrap(), 7).unwrap()
}

/// Benchmark: horizontal average of T·w (a flux profile).
fn bench_horizontal_average(c: &mut Criterion) {
    let mut group = c.benchmark_group("horizontal_average_flux");
    for backend in BACKENDS {
        let model = model(backend);
        let avg = HorizontalAverage::new(["T", "w"], Trigger::iterations(1).unwrap()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(backend.name()), &model, |b, m| {
            b.iter(|| black_box(avg.compute(m).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark: NaN scan over all prognostic fields.
fn bench_nan_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("nan_check_5_fields");
    for backend in BACKENDS {
        let model = model(backend);
        let checker = NaNChecker::new(["u", "v", "w", "T", "S"], Trigger::iterations(1).unwrap());
        group.bench_with_input(BenchmarkId::from_parameter(backend.name()), &model, |b, m| {
            b.iter(|| checker.run(black_box(m)).unwrap());
        });
    }
    group.finish();
}

/// Benchmark: advective CFL and velocity divergence statistics.
fn bench_cfl_and_divergence(c: &mut Criterion) {
    let model = model(Backend::Serial);
    c.bench_function("advective_cfl", |b| {
        b.iter(|| black_box(advective_cfl(&model, 10.0).unwrap()));
    });
    c.bench_function("velocity_divergence", |b| {
        b.iter(|| black_box(divergence(&model).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_horizontal_average,
    bench_nan_check,
    bench_cfl_and_divergence
);
criterion_main!(benches);
