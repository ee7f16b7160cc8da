//! The two "outer" channels: rise/fall function generators that turn into
//! shaped slew limiters when a signal is patched and nothing is cycling.
//!
//! - [`config`]: static wiring and calibration per channel
//! - [`state`]: the continuous state one channel carries between samples
//! - [`timing`]: cached stage times with control-rate throttling
//! - [`channel`]: the per-sample state machine

pub mod channel;
pub mod config;
pub mod state;
pub mod timing;

pub use channel::{OuterChannelOutput, OuterContext};
pub use config::{OuterChannelConfig, OuterChannelId, OuterChannelInputs, OuterPhase};
pub use state::OuterChannelState;
pub use timing::{StageTimes, TimingClock};

/// Bottom of the generator range.
pub const V_MIN: f32 = 0.0;
/// Top of the generator range.
pub const V_MAX: f32 = 10.2;
pub const V_RANGE: f32 = V_MAX - V_MIN;

/// Gate outputs swing between 0 V and this.
pub const GATE_HIGH_V: f32 = 10.0;
/// Cycle CV at or above this engages cycling.
pub const CYCLE_CV_THRESHOLD_V: f32 = 2.5;

/// Fastest accepted trigger rate.
pub const MAX_TRIGGER_HZ: f32 = 2000.0;
/// Fastest self-cycling rate.
pub const MAX_CYCLE_HZ: f32 = 1000.0;

/// Signal injection time constant while a stage runs.
pub const INJECTION_TAU_S: f32 = 0.0015;
pub const INJECTION_GAIN: f32 = 0.55;

/// Target movement (volts) that starts a new slew segment.
pub const SLEW_TARGET_EPS: f32 = 1e-4;
/// Distance (volts) below which the slew limiter lands on its target.
pub const SLEW_SNAP_EPS: f32 = 1e-9;

/// Floor applied to every time before dividing by it.
pub(crate) const TIME_FLOOR: f32 = 1e-6;
/// Crossing fraction used for steps that happen at the top of a sample.
pub(crate) const START_OF_SAMPLE_FRACTION: f32 = 1e-6;
