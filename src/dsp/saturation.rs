//! Soft saturation modeling analog op-amp headroom.
//!
//! The mix bus of the hardware is built from op-amps running off ±12 V
//! rails. Sums that exceed the rails do not clip hard; they bend smoothly
//! towards the limit. We model that with a scaled tanh:
//!
//!   output = sat_v · tanh(drive · input / sat_v)
//!
//! # Parameters
//!
//!   sat_v   Voltage the output approaches asymptotically (headroom).
//!   drive   Small-signal gain. 1.0 keeps low-level signals at unity; values
//!           slightly above 1 push the knee lower, as a real stage does.
//!
//! # Fast tanh
//!
//! A Padé-style rational approximation replaces `f32::tanh` on the audio path:
//!
//!   tanh(x) ≈ x · (27 + x²) / (27 + 9x²)
//!
//! It is exact at 0, odd-symmetric, within ~0.025 of tanh for |x| ≤ 3, and
//! reaches ±1 at |x| = 3. Past that point it keeps growing, so it is
//! clamped to ±1.
//!
//! # Variants
//!
//!   soft_sat_sym   bipolar signals (SUM, INV)
//!   soft_sat_pos   unipolar signals (OR), floored at 0 and capped at sat_v
//!   hard_clip      ideal mode, a plain clamp

/// Rational tanh approximation, clamped to [-1, 1].
#[inline]
pub fn fast_tanh(x: f32) -> f32 {
    let x = x.clamp(-3.0, 3.0);
    let x2 = x * x;
    x * (27.0 + x2) / (27.0 + 9.0 * x2)
}

/// Symmetric soft saturation towards ±`sat_v`.
#[inline]
pub fn soft_sat_sym(x: f32, sat_v: f32, drive: f32) -> f32 {
    let sat_v = sat_v.max(1e-6);
    sat_v * fast_tanh((drive / sat_v) * x)
}

/// Positive-only soft saturation towards `sat_v`.
#[inline]
pub fn soft_sat_pos(x: f32, sat_v: f32, drive: f32) -> f32 {
    let y = soft_sat_sym(x.max(0.0), sat_v, drive);
    y.clamp(0.0, sat_v.max(1e-6))
}

/// Ideal limiting: clamp to [lo, hi].
#[inline]
pub fn hard_clip(x: f32, lo: f32, hi: f32) -> f32 {
    x.clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_tanh_tracks_tanh() {
        for i in -30..=30 {
            let x = i as f32 / 10.0;
            assert!((fast_tanh(x) - x.tanh()).abs() < 0.03, "x={x}");
        }
    }

    #[test]
    fn fast_tanh_is_bounded() {
        assert_eq!(fast_tanh(100.0), 1.0);
        assert_eq!(fast_tanh(-100.0), -1.0);
        assert_eq!(fast_tanh(0.0), 0.0);
    }

    #[test]
    fn small_signals_pass_at_drive_gain() {
        // 0.1 V into 10 V headroom is deep in the linear region.
        let y = soft_sat_sym(0.1, 10.0, 1.0);
        assert!((y - 0.1).abs() < 1e-4);
    }

    #[test]
    fn large_signals_stay_inside_headroom() {
        for &x in &[15.0f32, 40.0, 1e6] {
            let y = soft_sat_sym(x, 10.0, 1.15);
            assert!(y <= 10.0 && y > 9.0, "x={x} y={y}");
            assert_eq!(soft_sat_sym(-x, 10.0, 1.15), -y);
        }
    }

    #[test]
    fn positive_variant_floors_at_zero() {
        assert_eq!(soft_sat_pos(-5.0, 10.0, 1.05), 0.0);
        assert!(soft_sat_pos(50.0, 10.0, 1.05) <= 10.0);
    }

    #[test]
    fn hard_clip_clamps() {
        assert_eq!(hard_clip(12.0, -10.0, 10.0), 10.0);
        assert_eq!(hard_clip(-12.0, -10.0, 10.0), -10.0);
        assert_eq!(hard_clip(3.0, 0.0, 10.0), 3.0);
    }
}
