//! Knob taper lookup.
//!
//! The rise/fall pots follow a measured, non-uniform law that is close to
//! `knob^2.2`. Evaluating `powf` twice per recompute is cheap, but the table
//! keeps the timing path free of transcendental calls and matches the exact
//! curve within linear-interpolation error (< 2e-4 over [0, 1]).

use std::sync::OnceLock;

/// Exponent of the power-law taper.
pub const TAPER_EXPONENT: f32 = 2.2;
/// Number of intervals in the table (points = size + 1).
pub const TAPER_TABLE_SIZE: usize = 256;

/// Precomputed `x^TAPER_EXPONENT` over [0, 1].
#[derive(Debug, Clone)]
pub struct KnobTaper {
    table: [f32; TAPER_TABLE_SIZE + 1],
}

impl KnobTaper {
    pub fn new(exponent: f32) -> Self {
        let mut table = [0.0; TAPER_TABLE_SIZE + 1];
        for (i, slot) in table.iter_mut().enumerate() {
            let x = i as f64 / TAPER_TABLE_SIZE as f64;
            *slot = x.powf(exponent as f64) as f32;
        }
        Self { table }
    }

    /// Shared table for the default exponent, built on first use.
    pub fn shared() -> &'static KnobTaper {
        static TAPER: OnceLock<KnobTaper> = OnceLock::new();
        TAPER.get_or_init(|| KnobTaper::new(TAPER_EXPONENT))
    }

    /// Shaped knob value; input is clamped to [0, 1].
    #[inline]
    pub fn lookup(&self, knob: f32) -> f32 {
        // NaN knob reads as fully counter-clockwise
        let knob = if knob.is_nan() { 0.0 } else { knob.clamp(0.0, 1.0) };
        let index = knob * TAPER_TABLE_SIZE as f32;
        let integral = (index as usize).min(TAPER_TABLE_SIZE - 1);
        let fractional = index - integral as f32;
        let a = self.table[integral];
        let b = self.table[integral + 1];
        a + (b - a) * fractional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_exact() {
        let taper = KnobTaper::shared();
        assert_eq!(taper.lookup(0.0), 0.0);
        assert_eq!(taper.lookup(1.0), 1.0);
        assert_eq!(taper.lookup(-3.0), 0.0);
        assert_eq!(taper.lookup(7.0), 1.0);
    }

    #[test]
    fn matches_power_law_within_interpolation_error() {
        let taper = KnobTaper::shared();
        for i in 0..=1000 {
            let x = i as f32 / 1000.0;
            let exact = x.powf(TAPER_EXPONENT);
            assert!((taper.lookup(x) - exact).abs() < 2e-4, "x={x}");
        }
    }

    #[test]
    fn is_monotone() {
        let taper = KnobTaper::shared();
        let mut prev = 0.0;
        for i in 0..=512 {
            let y = taper.lookup(i as f32 / 512.0);
            assert!(y >= prev);
            prev = y;
        }
    }
}
