//! Benchmarking the recording overhead of counters and stopwatches.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use simons::{Registry, SimonState};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn entrypoint(c: &mut Criterion) {
    let registry = Registry::new();
    let counter = registry.counter("bench.counter").unwrap();
    let stopwatch = registry.stopwatch("bench.stopwatch").unwrap();

    let mut group = c.benchmark_group("simons_recording");

    group.bench_function("counter_increase", |b| b.iter(|| counter.increase()));

    group.bench_function("counter_increase_by", |b| {
        b.iter(|| counter.increase_by(black_box(3)));
    });

    group.bench_function("stopwatch_start_stop", |b| {
        b.iter(|| black_box(stopwatch.start().stop()));
    });

    group.bench_function("stopwatch_add_split", |b| {
        b.iter(|| stopwatch.add_split(black_box(1_000)));
    });

    group.bench_function("lookup_existing", |b| {
        b.iter(|| black_box(registry.counter(black_box("bench.counter")).unwrap()));
    });

    registry
        .set_state(registry.root(), SimonState::Disabled, false)
        .unwrap();

    // The disabled path is a single flag check, this is the floor.
    group.bench_function("counter_increase_disabled", |b| {
        b.iter(|| counter.increase());
    });

    group.bench_function("stopwatch_start_stop_disabled", |b| {
        b.iter(|| black_box(stopwatch.start().stop()));
    });

    group.finish();
}
