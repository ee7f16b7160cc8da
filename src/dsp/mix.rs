//! Analog-style SUM / OR / INV bus.

/*
The Normalled Bus
=================

Each of the four channels has its own variable output jack. A channel feeds
the shared bus only while that jack is *unpatched*: plugging a cable in pulls
the channel off the bus. This mirrors the hardware, where the jack's switch
contact is what connects the channel to the mixing node.

Vocabulary
----------

  contributing   A channel whose variable output jack is not patched.

  SUM            Algebraic sum of the contributing channels.

  OR             Analog maximum: the largest contributing voltage, each seen
                 through a diode (minus `or_v_drop`), never below 0 V.

  INV            The negated SUM.

  ideal mode     Hard clamps: SUM and INV to ±10 V, OR to 0..10 V.

  non-ideal      Soft saturation (see `saturation.rs`) with per-output
                 headroom and drive, modeling the op-amp stages.


The Math
--------

    contributing = { v[i] | !patched[i] }

    sum_raw = Σ contributing
    or_raw  = max(0, max(contributing - or_v_drop))

    ideal:      sum = clamp(sum_raw, -10, 10)
                inv = clamp(-sum, -10, 10)
                or  = clamp(or_raw, 0, 10)

    non-ideal:  sum = sat_sym(sum_raw, sum_sat_v, sum_drive)
                inv = -sum                     (optionally saturated again)
                or  = sat_pos(or_raw, or_sat_v, or_drive)


Clipping Risk
-------------

Four channels at +10 V sum to +40 V. Ideal mode flattens that at exactly
10 V; non-ideal mode bends smoothly and never exceeds the saturation voltage.
*/

use super::saturation::{hard_clip, soft_sat_pos, soft_sat_sym};

/// Number of channels feeding the bus.
pub const BUS_CHANNELS: usize = 4;
/// Output limit in ideal mode.
pub const BUS_LIMIT_V: f32 = 10.0;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixNonIdealCal {
    /// Soft saturation on (non-ideal) or hard clamps (ideal).
    pub enabled: bool,

    pub sum_sat_v: f32,
    pub sum_drive: f32,

    pub or_sat_v: f32,
    pub or_drive: f32,
    /// Diode drop subtracted from each channel before the OR.
    pub or_v_drop: f32,

    /// Saturate INV a second time instead of mirroring SUM.
    pub inv_use_extra_sat: bool,
    pub inv_sat_v: f32,
    pub inv_drive: f32,
}

impl Default for MixNonIdealCal {
    fn default() -> Self {
        Self {
            enabled: true,
            sum_sat_v: 10.0,
            sum_drive: 1.15,
            or_sat_v: 10.0,
            or_drive: 1.05,
            or_v_drop: 0.0,
            inv_use_extra_sat: false,
            inv_sat_v: 10.0,
            inv_drive: 1.0,
        }
    }
}

impl MixNonIdealCal {
    /// Saturation voltages and drives are finite and positive, the diode
    /// drop is finite.
    pub fn is_valid(&self) -> bool {
        let positive = [
            self.sum_sat_v,
            self.sum_drive,
            self.or_sat_v,
            self.or_drive,
            self.inv_sat_v,
            self.inv_drive,
        ];
        positive.iter().all(|v| v.is_finite() && *v > 0.0) && self.or_v_drop.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BusOutputs {
    pub sum: f32,
    pub or: f32,
    pub inv: f32,
}

/// Mix the four channel voltages onto the bus.
///
/// `patched[i]` is true when channel `i`'s own output jack is connected,
/// which removes it from the bus.
#[inline]
pub fn mix_bus(
    values: &[f32; BUS_CHANNELS],
    patched: &[bool; BUS_CHANNELS],
    cal: &MixNonIdealCal,
) -> BusOutputs {
    let mut sum_raw = 0.0;
    let mut or_raw = 0.0f32;
    for (&v, &is_patched) in values.iter().zip(patched.iter()) {
        if is_patched {
            continue;
        }
        sum_raw += v;
        or_raw = or_raw.max(v - cal.or_v_drop);
    }

    if cal.enabled {
        let sum = soft_sat_sym(sum_raw, cal.sum_sat_v, cal.sum_drive);
        let inv = if cal.inv_use_extra_sat {
            soft_sat_sym(-sum, cal.inv_sat_v, cal.inv_drive)
        } else {
            -sum
        };
        BusOutputs {
            sum,
            or: soft_sat_pos(or_raw, cal.or_sat_v, cal.or_drive),
            inv,
        }
    } else {
        let sum = hard_clip(sum_raw, -BUS_LIMIT_V, BUS_LIMIT_V);
        BusOutputs {
            sum,
            or: hard_clip(or_raw, 0.0, BUS_LIMIT_V),
            inv: hard_clip(-sum, -BUS_LIMIT_V, BUS_LIMIT_V),
        }
    }
}

/// Bipolar attenuverter gain: CCW = -1, noon = 0, CW = +1.
#[inline]
pub fn attenuverter_gain(knob01: f32) -> f32 {
    knob01.clamp(0.0, 1.0) * 2.0 - 1.0
}
