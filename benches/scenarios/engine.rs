//! Benchmarks for `FluxEngine::process` in typical patches.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use integral_flux::engine::ports::{InputId, OutputId, ParamId, PortFrame};
use integral_flux::outer::OuterChannelId;
use integral_flux::{EngineSettings, FluxEngine};

use crate::BLOCK_SIZES;

const DT: f32 = 1.0 / 48_000.0;

fn render(engine: &mut FluxEngine, frame: &PortFrame, buffer: &mut [f32]) {
    for sample in buffer.iter_mut() {
        *sample = engine.process(frame, DT).get(OutputId::Sum);
    }
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === Both channels cycling, naive edges ===
        let mut frame = PortFrame::new();
        frame.set_param(ParamId::Rise1, 0.3);
        frame.set_param(ParamId::Fall4, 0.2);
        let mut engine = FluxEngine::default();
        engine.set_cycle_latched(OuterChannelId::Ch1, true);
        engine.set_cycle_latched(OuterChannelId::Ch4, true);
        group.bench_with_input(BenchmarkId::new("cycling", size), &size, |b, _| {
            b.iter(|| render(&mut engine, black_box(&frame), &mut buffer))
        });

        // === Same, with band-limited gates and signals ===
        let mut engine = FluxEngine::new(EngineSettings {
            ch1_cycle_latched: true,
            ch4_cycle_latched: true,
            bandlimited_gates: true,
            bandlimited_signals: true,
            ..EngineSettings::default()
        });
        group.bench_with_input(BenchmarkId::new("cycling_bandlimited", size), &size, |b, _| {
            b.iter(|| render(&mut engine, black_box(&frame), &mut buffer))
        });

        // === Slew limiting with moving CV at control rate ===
        let mut frame = PortFrame::new();
        frame.patch(InputId::Signal1, 7.0);
        frame.patch(InputId::Signal4, -4.0);
        frame.patch(InputId::BothCv1, 1.5);
        frame.set_param(ParamId::Shape1, 0.9);
        let mut engine = FluxEngine::new(EngineSettings {
            timing_update_div: 32,
            ..EngineSettings::default()
        });
        let mut flip = false;
        group.bench_with_input(BenchmarkId::new("slew_div32", size), &size, |b, _| {
            b.iter(|| {
                flip = !flip;
                frame.patch(InputId::Signal1, if flip { 7.0 } else { 1.0 });
                render(&mut engine, black_box(&frame), &mut buffer)
            })
        });
    }

    group.finish();
}
