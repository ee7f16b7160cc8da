//! Benchmarks for the DSP primitives and the full module.
//!
//! Run with: cargo bench
//!
//! The engine runs one `process` call per sample, so the numbers that matter
//! are per-block totals against the real-time deadline.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Primitives (warp, stage time, minBLEP, bus)
//!   - scenarios/*  Whole-module rendering in typical patches

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    // Primitives
    dsp::bench_warp,
    dsp::bench_stage_time,
    dsp::bench_minblep,
    dsp::bench_mix,
    // Whole module
    scenarios::bench_engine,
);
criterion_main!(benches);
