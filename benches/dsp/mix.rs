//! Benchmarks for the SUM / OR / INV bus.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use integral_flux::dsp::{mix_bus, MixNonIdealCal};

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mix");

    for &size in BLOCK_SIZES {
        let frames: Vec<[f32; 4]> = (0..size)
            .map(|i| {
                let t = i as f32 * 0.05;
                [t.sin() * 8.0, 10.0, 5.0, t.cos() * 8.0]
            })
            .collect();
        let patched = [false, true, false, false];

        for (name, enabled) in [("ideal", false), ("non_ideal", true)] {
            let cal = MixNonIdealCal {
                enabled,
                ..MixNonIdealCal::default()
            };
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    let mut acc = 0.0f32;
                    for values in &frames {
                        let out = mix_bus(black_box(values), &patched, &cal);
                        acc += out.sum + out.or + out.inv;
                    }
                    acc
                })
            });
        }
    }

    group.finish();
}
