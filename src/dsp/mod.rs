//! Low-level DSP primitives used by the outer channels and the mix bus.
//!
//! These components are allocation-free on the audio path and realtime-safe.
//! Lookup tables (knob taper, minBLEP) are built once on first use; the
//! engine touches them at construction so the audio thread never does.

/// minBLEP discontinuity correction for gate and signal outputs.
pub mod minblep;
/// SUM / OR / INV bus with ideal and non-ideal response.
pub mod mix;
/// Fast tanh soft saturation.
pub mod saturation;
/// Edge detection with hysteresis.
pub mod schmitt;
/// Knob, CV and shape to stage duration.
pub mod stage_time;
/// Power-law knob taper lookup.
pub mod taper;
/// Shape to slope-warp mapping and its duration normalization.
pub mod warp;

pub use minblep::MinBlepGenerator;
pub use mix::{mix_bus, BusOutputs, MixNonIdealCal};
pub use schmitt::SchmittTrigger;
pub use warp::{shape_signed_from_knob, slope_warp, slope_warp_scale};
