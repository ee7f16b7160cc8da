//! Benchmarks for minBLEP correction.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use integral_flux::dsp::MinBlepGenerator;

use crate::BLOCK_SIZES;

pub fn bench_minblep(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/minblep");

    for &size in BLOCK_SIZES {
        // Draining with no pending steps (the common case)
        let mut idle = MinBlepGenerator::new();
        group.bench_with_input(BenchmarkId::new("process_idle", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for _ in 0..size {
                    acc += idle.process();
                }
                acc
            })
        });

        // A step every 16 samples, like a fast gate
        let mut busy = MinBlepGenerator::new();
        group.bench_with_input(BenchmarkId::new("insert_every_16", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for i in 0..size {
                    if i % 16 == 0 {
                        let step = if (i / 16) % 2 == 0 { 10.0 } else { -10.0 };
                        busy.insert_discontinuity(black_box(-0.37), step);
                    }
                    acc += busy.process();
                }
                acc
            })
        });
    }

    group.finish();
}
