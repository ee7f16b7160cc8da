//! Shape / warp math shared by the function generator and the slew limiter.

/*
Slope Warping
=============

The outer channels never evaluate a curve like `y = x^gamma`. Instead they
integrate a voltage whose *speed* depends on where it currently is. The shape
knob bends that speed profile:

    LOG   fast near 0 V, slow near the top        multiplier = 1 / (1 + k·x²)
    LIN   constant speed                          multiplier = 1
    EXP   slow near 0 V, fast near the top        multiplier = 1 + k·x²

where x is the normalized voltage position in [0, 1] and k = K_MAX·|s|.

Vocabulary
----------

  shape01       Raw knob position, 0.0 to 1.0.

  pivot         Knob position that produces a pure linear ramp (0.33). The
                knob is split around it so each side gets its full travel.

  s             Signed warp amount in [-1, 1]. Negative leans logarithmic,
                positive leans exponential, zero is linear.

  warp scale    Correction factor so that bending the speed profile does not
                change how long a stage takes.


Knob to Signed Warp
-------------------

        s
     +1 ┤                      ╱
        │                   ╱
      0 ┤ ─ ─ ─ ─ ─ ─ ─ ─●
        │            ╱   pivot
     -1 ┤──────╱
        └──────────────────────── shape01
        0        0.33           1

Both halves are linear, so s is continuous across the pivot.


Keeping Stage Time Constant
---------------------------

With a per-sample step of `dt/T · warp(x)`, the time spent crossing the
segment is

    T · ∫ dx / warp(x)

which is no longer T once warp(x) ≠ 1. Multiplying every step by

    scale = ∫ 1/warp(x) dx      (midpoint rule, 16 points)

cancels the integral, so a warped stage still lasts T. Only the instantaneous
speed profile changes.
*/

/// Knob position that yields a linear ramp.
pub const LINEAR_SHAPE: f32 = 0.33;
/// Warp aggressiveness at full deflection.
pub const WARP_K_MAX: f32 = 40.0;
/// Midpoints used to integrate the warp normalization.
pub const WARP_SCALE_SAMPLES: usize = 16;

const LINEAR_EPS: f32 = 1e-6;

/// Map a shape knob in [0, 1] to a signed warp amount in [-1, 1].
#[inline]
pub fn shape_signed_from_knob(shape01: f32) -> f32 {
    let shape = shape01.clamp(0.0, 1.0);
    if shape < LINEAR_SHAPE {
        (shape - LINEAR_SHAPE) / LINEAR_SHAPE
    } else if shape > LINEAR_SHAPE {
        (shape - LINEAR_SHAPE) / (1.0 - LINEAR_SHAPE)
    } else {
        0.0
    }
}

/// Instantaneous slope multiplier at normalized position `x` for warp `s`.
#[inline]
pub fn slope_warp(x: f32, s: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    let u = s.abs().min(1.0);
    if u < LINEAR_EPS {
        return 1.0;
    }

    let k = WARP_K_MAX * u;
    let x2 = x * x;
    if s < 0.0 {
        1.0 / (1.0 + k * x2)
    } else {
        1.0 + k * x2
    }
}

/// Duration-preserving scale for warp `s`: the mean of `1 / slope_warp`.
pub fn slope_warp_scale(s: f32) -> f32 {
    if s.abs() < LINEAR_EPS {
        return 1.0;
    }

    let n = WARP_SCALE_SAMPLES as f32;
    let sum: f32 = (0..WARP_SCALE_SAMPLES)
        .map(|i| {
            let xi = (i as f32 + 0.5) / n;
            1.0 / slope_warp(xi, s)
        })
        .sum();
    sum / n
}

/// Per-channel cache of the warp scale, keyed on the signed shape.
#[derive(Debug, Clone, Copy)]
pub struct WarpScaleCache {
    valid: bool,
    shape_signed: f32,
    scale: f32,
}

impl WarpScaleCache {
    /// Signed-shape change that forces a recompute.
    pub const EPS: f32 = 1e-4;

    pub const fn new() -> Self {
        Self {
            valid: false,
            shape_signed: 0.0,
            scale: 1.0,
        }
    }

    /// Return the scale for `s`, recomputing only when it moved beyond `EPS`.
    #[inline]
    pub fn get(&mut self, s: f32) -> f32 {
        if !self.valid || (s - self.shape_signed).abs() > Self::EPS {
            self.shape_signed = s;
            self.scale = slope_warp_scale(s);
            self.valid = true;
        }
        self.scale
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

impl Default for WarpScaleCache {
    fn default() -> Self {
        Self::new()
    }
}
