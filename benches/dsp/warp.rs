//! Benchmarks for slope warping.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use integral_flux::dsp::warp::{slope_warp, slope_warp_scale, WarpScaleCache};

use crate::BLOCK_SIZES;

pub fn bench_warp(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/warp");

    for &size in BLOCK_SIZES {
        let xs: Vec<f32> = (0..size).map(|i| i as f32 / size as f32).collect();

        // Per-sample slope multiplier across a full segment
        group.bench_with_input(BenchmarkId::new("slope_warp", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for &x in &xs {
                    acc += slope_warp(black_box(x), black_box(-0.7));
                }
                acc
            })
        });

        // Uncached normalization, as if the shape changed every sample
        group.bench_with_input(BenchmarkId::new("scale_uncached", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for &x in &xs {
                    acc += slope_warp_scale(black_box(x * 2.0 - 1.0));
                }
                acc
            })
        });

        // Cached normalization with a still knob
        let mut cache = WarpScaleCache::new();
        group.bench_with_input(BenchmarkId::new("scale_cached", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for _ in 0..size {
                    acc += cache.get(black_box(0.4));
                }
                acc
            })
        });
    }

    group.finish();
}
