//! Stage-time model: knob, CV and shape to rise/fall durations in seconds.

/*
Stage Time
==========

A stage is either the rise or the fall of one function-generator cycle. Its
duration is built from four multiplicative terms:

    t = MIN_TIME · (MAX_TIME / MIN_TIME)^taper(knob)      knob law
          · 2^(octaves(stage CV))                          rise or fall CV
          · both_scale(both CV)                            shared CV
          · shape_scale(shape)                             shape calibration

then clamped to [ABSOLUTE_MIN_TIME, MAX_TIME].

Knob Law
--------

MIN_TIME = 1 ms and MAX_TIME = 1500 s span log2(1.5e6) ≈ 20.5 octaves. The
knob first passes through a `x^2.2` taper (see `taper.rs`), so noon lands
around 23x slower than fully counter-clockwise instead of ~1200x.

    octaves above MIN_TIME
     20 ┤                          ╱
        │                       ╱
        │                   ╱
      5 ┤           ___──
      0 ┼──────────          knob
        0          0.5           1

Stage CV
--------

Linear in volts, exponential in time: 1.5 octaves per volt, positive CV is
slower. The input is soft-clamped to ±8 V (1 V knee) and the resulting shift
is clamped to ±12 octaves.

Both CV
-------

The shared CV does not follow a clean exponential law on the hardware. The
measured cycle frequency fits a saturating curve:

    f_exp(v) = REF_HZ · 2^((v - REF_V) / VOLTS_PER_OCTAVE)
    f(v)     = OFF_HZ + 1 / (1 / MAX_HZ + 1 / f_exp(v))

Exponential in the middle, flattening towards MAX_HZ for large positive CV
and towards OFF_HZ for large negative CV. The time multiplier is
f(NEUTRAL_V) / f(v), so the neutral voltage leaves timing untouched. These
constants are fitted calibration data; keep them as they are.

Shape Scale
-----------

Bending the slope profile also changes the measured period on the hardware.
Each channel carries two calibration points, the time multiplier at full LOG
and at full EXP. The scale is interpolated in log2 domain across the pivot so
it is continuous (exactly 1 at the pivot):

    log2 scale
    log2(log_cal) ┤╲
                  │  ╲
                0 ┤────●──────────────
                  │     pivot   ╲___
    log2(exp_cal) ┤                  ──
                  └──────────────────── shape01
*/

use super::taper::KnobTaper;
use super::warp::LINEAR_SHAPE;

/// Stage time at knob 0, linear shape and neutral both CV (500 Hz cycle).
pub const MIN_TIME: f32 = 0.001;
/// Floor reachable through CV and EXP shape.
pub const ABSOLUTE_MIN_TIME: f32 = 0.0001;
/// Longest stage.
pub const MAX_TIME: f32 = 1500.0;

/// Soft clamp limit applied to rise/fall CV.
pub const STAGE_CV_LIMIT_V: f32 = 8.0;
/// Width of the soft knee below the limit.
pub const STAGE_CV_KNEE_V: f32 = 1.0;
/// Duration shift per volt of rise/fall CV.
pub const STAGE_CV_OCTAVES_PER_VOLT: f32 = 1.5;
/// Largest shift rise/fall CV may apply.
pub const MAX_OCTAVE_SHIFT: f32 = 12.0;

/// Saturating frequency-response fit for the shared "both" CV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BothCvFit {
    pub off_hz: f32,
    pub max_hz: f32,
    pub volts_per_octave: f32,
    pub ref_v: f32,
    pub ref_hz: f32,
    pub neutral_v: f32,
}

impl BothCvFit {
    /// Fit measured on the reference unit.
    pub const MEASURED: BothCvFit = BothCvFit {
        off_hz: 0.05,
        max_hz: 4000.0,
        volts_per_octave: 2.0,
        ref_v: 0.0,
        ref_hz: 500.0,
        neutral_v: -0.05,
    };

    /// Modeled cycle frequency for a given both-CV voltage.
    #[inline]
    pub fn frequency(&self, volts: f32) -> f32 {
        let v = finite_or_zero(volts).clamp(-12.0, 12.0);
        let f_exp = self.ref_hz * ((v - self.ref_v) / self.volts_per_octave).exp2();
        let saturated = 1.0 / (1.0 / self.max_hz + 1.0 / f_exp.max(f32::MIN_POSITIVE));
        self.off_hz + saturated
    }

    /// Time multiplier relative to the neutral voltage.
    #[inline]
    pub fn time_scale(&self, volts: f32) -> f32 {
        self.frequency(self.neutral_v) / self.frequency(volts)
    }
}

impl Default for BothCvFit {
    fn default() -> Self {
        Self::MEASURED
    }
}

/// Per-channel shape-to-time calibration, measured at rise/fall = 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeTimeCal {
    /// Time multiplier at full LOG.
    pub log_scale: f32,
    /// Time multiplier at full EXP.
    pub exp_scale: f32,
}

impl ShapeTimeCal {
    pub const UNITY: ShapeTimeCal = ShapeTimeCal {
        log_scale: 1.0,
        exp_scale: 1.0,
    };
}

/// Identity below `limit - knee`, then a tanh knee towards `limit`.
#[inline]
pub fn soft_clamp(x: f32, limit: f32, knee: f32) -> f32 {
    let x = finite_or_zero(x);
    let linear = limit - knee;
    let mag = x.abs();
    if mag <= linear {
        return x;
    }
    let knee = knee.max(1e-6);
    let bent = linear + knee * ((mag - linear) / knee).tanh();
    bent.copysign(x)
}

/// Octave shift (positive = longer) applied by a rise or fall CV.
#[inline]
pub fn stage_cv_octaves(cv: f32) -> f32 {
    let v = soft_clamp(cv, STAGE_CV_LIMIT_V, STAGE_CV_KNEE_V);
    (v * STAGE_CV_OCTAVES_PER_VOLT).clamp(-MAX_OCTAVE_SHIFT, MAX_OCTAVE_SHIFT)
}

/// Shape contribution to stage time, continuous across the pivot.
#[inline]
pub fn shape_time_scale(shape01: f32, cal: ShapeTimeCal) -> f32 {
    let shape = finite_or_zero(shape01).clamp(0.0, 1.0);
    if shape < LINEAR_SHAPE {
        let t = shape / LINEAR_SHAPE;
        (cal.log_scale.max(1e-6).log2() * (1.0 - t)).exp2()
    } else if shape > LINEAR_SHAPE {
        let t = (shape - LINEAR_SHAPE) / (1.0 - LINEAR_SHAPE);
        (cal.exp_scale.max(1e-6).log2() * t).exp2()
    } else {
        1.0
    }
}

/// Stage duration in seconds.
///
/// `both_scale` and `shape_scale` are shared between rise and fall, so the
/// caller evaluates them once and passes the multipliers in.
#[inline]
pub fn compute_stage_time(knob: f32, stage_cv: f32, both_scale: f32, shape_scale: f32) -> f32 {
    let shaped = KnobTaper::shared().lookup(knob);
    let span_octaves = (MAX_TIME / MIN_TIME).log2();
    let octaves = shaped * span_octaves + stage_cv_octaves(stage_cv);

    let t = MIN_TIME * octaves.exp2() * both_scale * shape_scale;
    if t.is_nan() {
        return MIN_TIME;
    }
    t.clamp(ABSOLUTE_MIN_TIME, MAX_TIME)
}

#[inline]
fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() {
        x
    } else if x.is_nan() {
        0.0
    } else {
        x.signum() * f32::MAX
    }
}
