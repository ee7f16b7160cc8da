//! Benchmarks for the stage-time model.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use integral_flux::dsp::stage_time::{BothCvFit, ShapeTimeCal};
use integral_flux::outer::timing::{stage_times_for, StageTimeCache, StageTimeKey, TimingClock};

use crate::BLOCK_SIZES;

const CAL: ShapeTimeCal = ShapeTimeCal {
    log_scale: 8.102198,
    exp_scale: 0.732835,
};

fn key(i: usize) -> StageTimeKey {
    StageTimeKey {
        rise_knob: 0.4,
        fall_knob: 0.6,
        shape: 0.2,
        rise_cv: (i as f32 * 0.01).sin() * 5.0,
        fall_cv: 0.0,
        both_cv: 1.0,
    }
}

pub fn bench_stage_time(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/stage_time");
    let fit = BothCvFit::MEASURED;

    for &size in BLOCK_SIZES {
        // Full evaluation every sample (CV moving, divider 1)
        group.bench_with_input(BenchmarkId::new("compute", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for i in 0..size {
                    acc += stage_times_for(black_box(&key(i)), CAL, &fit).rise;
                }
                acc
            })
        });

        // Moving CV through the cache with control-rate updates every 32 samples
        let mut cache = StageTimeCache::new();
        group.bench_with_input(BenchmarkId::new("cached_div32", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for i in 0..size {
                    let clock = TimingClock {
                        tick: i % 32 == 0,
                        divider: 32,
                        interpolate: true,
                    };
                    acc += cache.update(black_box(key(i)), CAL, &fit, clock).rise;
                }
                acc
            })
        });
    }

    group.finish();
}
