//! Benchmarks for low-level DSP primitives.

mod minblep;
mod mix;
mod stage_time;
mod warp;

pub use minblep::bench_minblep;
pub use mix::bench_mix;
pub use stage_time::bench_stage_time;
pub use warp::bench_warp;
