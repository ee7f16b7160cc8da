//! Configuration surface of the module.
//!
//! Plain fields with get/set semantics. Save/restore framing belongs to the
//! host; with the `serde` feature the struct derives `Serialize` and
//! `Deserialize` so a host can pick whatever format it likes.

use tracing::warn;

use crate::dsp::MixNonIdealCal;

/// Divider choices a front-end offers. Other values >= 1 are accepted.
pub const TIMING_UPDATE_DIVIDERS: [u32; 5] = [1, 4, 8, 16, 32];

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub ch1_cycle_latched: bool,
    pub ch4_cycle_latched: bool,

    /// Bus calibration; `mix.enabled` selects non-ideal (soft) mixing.
    pub mix: MixNonIdealCal,

    pub bandlimited_gates: bool,
    pub bandlimited_signals: bool,

    /// Ramp stage times between control-rate updates.
    pub timing_interpolate: bool,
    /// Stage times refresh every this many samples.
    pub timing_update_div: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ch1_cycle_latched: false,
            ch4_cycle_latched: false,
            mix: MixNonIdealCal::default(),
            bandlimited_gates: false,
            bandlimited_signals: false,
            timing_interpolate: true,
            timing_update_div: 1,
        }
    }
}

impl EngineSettings {
    /// Correct out-of-range values to the nearest valid ones.
    pub fn sanitized(mut self) -> Self {
        if self.timing_update_div < 1 {
            warn!(
                requested = self.timing_update_div,
                "timing update divider below 1, using 1"
            );
            self.timing_update_div = 1;
        }

        let cal = &mut self.mix;
        let defaults = MixNonIdealCal::default();
        let fields = [
            (&mut cal.sum_sat_v, defaults.sum_sat_v, "sum_sat_v"),
            (&mut cal.sum_drive, defaults.sum_drive, "sum_drive"),
            (&mut cal.or_sat_v, defaults.or_sat_v, "or_sat_v"),
            (&mut cal.or_drive, defaults.or_drive, "or_drive"),
            (&mut cal.inv_sat_v, defaults.inv_sat_v, "inv_sat_v"),
            (&mut cal.inv_drive, defaults.inv_drive, "inv_drive"),
        ];
        for (value, fallback, name) in fields {
            if !value.is_finite() || *value <= 0.0 {
                warn!(field = name, value = *value, "invalid mix calibration, using default");
                *value = fallback;
            }
        }
        if !cal.or_v_drop.is_finite() {
            warn!(value = cal.or_v_drop, "invalid OR diode drop, using default");
            cal.or_v_drop = defaults.or_v_drop;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_is_floored() {
        let settings = EngineSettings {
            timing_update_div: 0,
            ..EngineSettings::default()
        }
        .sanitized();
        assert_eq!(settings.timing_update_div, 1);
    }

    #[test]
    fn valid_settings_pass_through() {
        let settings = EngineSettings {
            timing_update_div: 16,
            bandlimited_gates: true,
            ..EngineSettings::default()
        };
        assert_eq!(settings.clone().sanitized(), settings);
    }

    #[test]
    fn bad_calibration_falls_back() {
        let mut settings = EngineSettings::default();
        settings.mix.sum_sat_v = f32::NAN;
        settings.mix.or_drive = -1.0;
        let fixed = settings.sanitized();
        assert_eq!(fixed.mix, MixNonIdealCal::default());
    }
}
