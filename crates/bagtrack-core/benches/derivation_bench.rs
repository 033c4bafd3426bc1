//! # Derivation Benchmarks
//!
//! Performance benchmarks for state derivation and event recording.
//!
//! Run with: `cargo bench -p bagtrack-core`

use bagtrack_core::{
    BagId, CheckpointEvent, CheckpointStage, NewBag, NewCheckpoint, StateDeriver, Tracker,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid")
}

/// History of `size` scans cycling through every stage.
fn create_history(size: usize) -> Vec<CheckpointEvent> {
    (0..size)
        .map(|i| {
            let stage = CheckpointStage::ALL[i % CheckpointStage::ALL.len()];
            CheckpointEvent::at(BagId::new("bench"), stage, t0() + TimeDelta::minutes(i as i64))
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive");
    let deriver = StateDeriver::new();

    for size in [10, 100, 1000].iter() {
        let history = create_history(*size);
        let now = t0() + TimeDelta::minutes(*size as i64 + 5);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(deriver.derive_predicted(black_box(&history), now)));
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_in_memory");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut tracker = Tracker::new();
                let bag = tracker
                    .register_bag(NewBag::with_tag("BENCH"), t0())
                    .expect("register");
                for i in 0..size {
                    let stage = CheckpointStage::ALL[i % CheckpointStage::ALL.len()];
                    let _ = tracker.scan(NewCheckpoint::new(bag.id.clone(), stage), t0());
                }
                black_box(tracker)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_derive, bench_scan);
criterion_main!(benches);
