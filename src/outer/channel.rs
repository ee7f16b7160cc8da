//! Per-sample processing of one outer channel.

/*
Function Generator and Slew Limiter
===================================

An outer channel is one integrator with two jobs. While a cycle is running it
draws a rise/fall function from 0 V up to V_MAX and back. While idle with a
signal patched it follows that signal at a limited, shaped speed. Both paths
use the same stage times and the same slope warp, so handing over between
them does not jump.

Vocabulary
----------

  phase         IDLE, RISE or FALL.

  phase_pos     Time progress through the current stage, 0..1. It may end a
                sample slightly above 1; the excess carries into the next
                stage so high rates keep their period.

  x             Voltage position normalized to [0, 1] over V_MIN..V_MAX.

  dp            Per-sample stage increment, dt / stage_time (capped at 0.5
                for the voltage step).

  gate-high     The phase during which this channel's gate jack reads 10 V.
                Channel 1's end-of-rise gate is high while falling; channel
                4's end-of-cycle gate is high while rising.


One Sample
----------

    cycle button edge ──► toggle latch
    trigger edge ───────► RISE (unless rising or still re-arming)
    controls ───────────► stage times (cached) ─► warp scale (cached)
    IDLE and cycling ───► RISE
    gate changed? ──────► gate step at the start of the sample

    RISE    phase_pos += dp
            x += dp · warp(x) · scale  (+ injection toward the signal)
            crossed 1? ─► FALL at V_MAX, gate/signal steps at fraction f

    FALL    mirror image, ends in IDLE at V_MIN

    IDLE    signal patched ─► shaped slew toward it
            otherwise      ─► 0 V


Crossing Fraction
-----------------

If phase_pos lands past 1 by `e`, the boundary happened `e / dp` of a sample
ago:

    f = clamp(1 - (phase_pos - 1) / dp, 0, 1)

f = 1 means "exactly now". The minBLEP correctors want the offset p = f - 1
in (-1, 0]. Steps caused at the top of a sample (trigger, cycle start,
unpatching) use f = 1e-6, i.e. right after the previous sample.


Slew Segments
-------------

The slew limiter walks a straight segment from where it started to where the
target was when the segment began. The segment phase

    seg = (out - start) / (target - start)

drives the warp, so the shape knob bends the slew exactly like it bends a
stage. A reversal, or a target that moves by more than 1e-4 V, starts a new
segment. Targets closer than 1e-9 V are taken as reached, so a segment
never divides by a vanishing span. The step is in volts:

    step = dp · warp(seg) · scale · (V_MAX - V_MIN)

and a step that would cross the target lands exactly on it.
*/

use crate::dsp::stage_time::BothCvFit;
use crate::dsp::warp::{shape_signed_from_knob, slope_warp};

use super::config::{OuterChannelConfig, OuterChannelInputs, OuterPhase};
use super::state::{OuterChannelState, SlewSegment};
use super::timing::{StageTimeKey, StageTimes, TimingClock};
use super::{
    CYCLE_CV_THRESHOLD_V, GATE_HIGH_V, MAX_CYCLE_HZ, MAX_TRIGGER_HZ, SLEW_SNAP_EPS,
    SLEW_TARGET_EPS, START_OF_SAMPLE_FRACTION, TIME_FLOOR, V_MAX, V_MIN, V_RANGE,
};

/// Engine-wide settings that apply to one processed sample.
#[derive(Debug, Clone, Copy)]
pub struct OuterContext {
    /// Seconds per sample.
    pub sample_time: f32,
    pub timing: TimingClock,
    pub bandlimited_gates: bool,
    pub bandlimited_signals: bool,
}

impl OuterContext {
    /// Audio-rate timing with band-limited gate and signal steps.
    pub fn new(sample_time: f32) -> Self {
        Self {
            sample_time,
            timing: TimingClock::AUDIO_RATE,
            bandlimited_gates: true,
            bandlimited_signals: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OuterChannelOutput {
    /// Channel voltage, band-limited if enabled.
    pub out: f32,
    /// Gate voltage (0 or 10 V), band-limited if enabled.
    pub gate: f32,
    pub gate_high: bool,
    /// Cycle latch or cycle CV is engaged.
    pub cycle_on: bool,
}

/// Sub-sample position, in [0, 1], at which `phase_pos` crossed 1.
#[inline]
pub fn phase_crossing_fraction(phase_pos: f32, dp: f32) -> f32 {
    if dp <= 1e-9 {
        return 1.0;
    }
    (1.0 - (phase_pos - 1.0) / dp).clamp(0.0, 1.0)
}

/// Stretch rise and fall by the same factor so their sum is at least
/// `min_period`.
#[inline]
pub fn enforce_min_period(times: StageTimes, min_period: f32) -> StageTimes {
    let total = times.period();
    if total.is_nan() || total <= 0.0 || total >= min_period {
        return times;
    }
    let k = min_period / total;
    StageTimes {
        rise: times.rise * k,
        fall: times.fall * k,
    }
}

#[inline]
fn normalize(volts: f32) -> f32 {
    ((volts - V_MIN) / V_RANGE).clamp(0.0, 1.0)
}

impl OuterChannelState {
    /// Advance the channel by one sample.
    pub fn process(
        &mut self,
        cfg: &OuterChannelConfig,
        inputs: &OuterChannelInputs,
        ctx: &OuterContext,
    ) -> OuterChannelOutput {
        let dt = if ctx.sample_time.is_finite() && ctx.sample_time > 0.0 {
            ctx.sample_time
        } else {
            0.0
        };
        let signal = inputs
            .signal
            .map(|v| if v.is_finite() { v } else { 0.0 });

        if self.cycle_button_edge.process(inputs.cycle_button) {
            self.cycle_latched = !self.cycle_latched;
        }
        let cycle_on = self.cycle_latched || inputs.cycle_cv >= CYCLE_CV_THRESHOLD_V;
        let gate_was_high = self.phase == cfg.gate_high_phase;

        self.rearm_timer = (self.rearm_timer - dt).max(0.0);
        let trigger_rise = self.trigger_edge.process(inputs.trigger);
        if trigger_rise && self.phase != OuterPhase::Rise && self.rearm_timer <= 0.0 {
            self.begin_rise(true, ctx.bandlimited_signals);
            self.rearm_timer = 1.0 / MAX_TRIGGER_HZ;
        }

        let key = StageTimeKey {
            rise_knob: inputs.rise_knob,
            fall_knob: inputs.fall_knob,
            shape: inputs.shape_knob,
            rise_cv: inputs.rise_cv,
            fall_cv: inputs.fall_cv,
            both_cv: inputs.both_cv,
        };
        let times = self
            .timing
            .update(key, cfg.shape_time, &BothCvFit::MEASURED, ctx.timing);
        let s = shape_signed_from_knob(inputs.shape_knob);
        self.shape_signed = s;
        let warp_scale = self.warp.get(s);

        if self.phase == OuterPhase::Idle && cycle_on {
            self.begin_rise(false, ctx.bandlimited_signals);
        }

        let gate_is_high = self.phase == cfg.gate_high_phase;
        if gate_is_high != gate_was_high {
            self.set_gate(gate_is_high, START_OF_SAMPLE_FRACTION, ctx.bandlimited_gates);
        }

        match self.phase {
            OuterPhase::Rise | OuterPhase::Fall => {
                let min_period = if !self.trigger_driven && cycle_on {
                    1.0 / MAX_CYCLE_HZ
                } else {
                    1.0 / MAX_TRIGGER_HZ
                };
                let times = enforce_min_period(times, min_period);
                self.advance_stage(cfg, times, s, warp_scale, signal, dt, ctx);
            }
            OuterPhase::Idle => match signal {
                Some(target) => self.slew_toward(target, times, s, warp_scale, dt),
                None => self.settle_to_zero(ctx.bandlimited_signals),
            },
        }

        let gate_correction = self.gate_blep.process();
        let signal_correction = self.signal_blep.process();

        let gate_base = if self.gate_state { GATE_HIGH_V } else { 0.0 };
        OuterChannelOutput {
            out: if ctx.bandlimited_signals {
                self.out + signal_correction
            } else {
                self.out
            },
            gate: if ctx.bandlimited_gates {
                gate_base + gate_correction
            } else {
                gate_base
            },
            gate_high: self.gate_state,
            cycle_on,
        }
    }

    fn begin_rise(&mut self, trigger_driven: bool, bandlimited_signals: bool) {
        self.phase = OuterPhase::Rise;
        self.phase_pos = 0.0;
        self.trigger_driven = trigger_driven;
        self.slew = SlewSegment::default();

        // A bipolar slew value outside the generator range jumps onto it.
        let clamped = self.out.clamp(V_MIN, V_MAX);
        if clamped != self.out {
            self.signal_step(START_OF_SAMPLE_FRACTION, clamped - self.out, bandlimited_signals);
            self.out = clamped;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn advance_stage(
        &mut self,
        cfg: &OuterChannelConfig,
        times: StageTimes,
        s: f32,
        warp_scale: f32,
        signal: Option<f32>,
        dt: f32,
        ctx: &OuterContext,
    ) {
        let rising = self.phase == OuterPhase::Rise;
        let stage_time = if rising { times.rise } else { times.fall }.max(TIME_FLOOR);

        let dp_phase = dt / stage_time;
        self.phase_pos += dp_phase;

        let mut x = normalize(self.out);
        let dp = dp_phase.clamp(0.0, 0.5);
        let dx = dp * slope_warp(x, s) * warp_scale;
        x = if rising { x + dx } else { x - dx };
        if let Some(v) = signal {
            x += self.injection.get(dt) * (normalize(v) - x);
        }
        x = x.clamp(0.0, 1.0);
        self.out = V_MIN + x * V_RANGE;

        let done = self.phase_pos >= 1.0 || if rising { x >= 1.0 } else { x <= 0.0 };
        if !done {
            return;
        }

        let f = phase_crossing_fraction(self.phase_pos, dp_phase);
        let boundary_v = if rising {
            let overshoot = (self.phase_pos - 1.0).max(0.0);
            self.phase_pos = overshoot * (times.rise / times.fall.max(TIME_FLOOR));
            self.phase = OuterPhase::Fall;
            V_MAX
        } else {
            self.phase_pos = 0.0;
            self.phase = OuterPhase::Idle;
            self.trigger_driven = false;
            V_MIN
        };

        let step = boundary_v - self.out;
        if step != 0.0 {
            self.signal_step(f, step, ctx.bandlimited_signals);
        }
        self.out = boundary_v;
        self.set_gate(self.phase == cfg.gate_high_phase, f, ctx.bandlimited_gates);
    }

    fn slew_toward(&mut self, target: f32, times: StageTimes, s: f32, warp_scale: f32, dt: f32) {
        let delta = target - self.out;
        if delta.abs() < SLEW_SNAP_EPS {
            self.out = target;
            self.slew.dir = 0;
            return;
        }

        let dir: i8 = if delta > 0.0 { 1 } else { -1 };
        if dir != self.slew.dir || (target - self.slew.target).abs() > SLEW_TARGET_EPS {
            let span = target - self.out;
            self.slew = SlewSegment {
                dir,
                start: self.out,
                target,
                inv_span: 1.0 / span,
            };
        }

        let seg_phase = (self.out - self.slew.start) * self.slew.inv_span;
        let seg_phase = if seg_phase.is_finite() {
            seg_phase.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let stage_time = if dir > 0 { times.rise } else { times.fall }.max(TIME_FLOOR);
        let dp = (dt / stage_time).clamp(0.0, 0.5);
        let step = dp * slope_warp(seg_phase, s) * warp_scale * V_RANGE;

        let prev = self.out;
        self.out += if dir > 0 { step } else { -step };
        if (target - prev) * (target - self.out) <= 0.0 {
            self.out = target;
            self.slew.dir = 0;
        }
    }

    fn settle_to_zero(&mut self, bandlimited_signals: bool) {
        self.slew = SlewSegment::default();
        if self.out != 0.0 {
            self.signal_step(START_OF_SAMPLE_FRACTION, -self.out, bandlimited_signals);
            self.out = 0.0;
        }
    }

    fn set_gate(&mut self, high: bool, fraction: f32, bandlimited: bool) {
        if high == self.gate_state {
            return;
        }
        if bandlimited {
            let p = fraction.clamp(START_OF_SAMPLE_FRACTION, 1.0) - 1.0;
            let step = if high { GATE_HIGH_V } else { -GATE_HIGH_V };
            self.gate_blep.insert_discontinuity(p, step);
        }
        self.gate_state = high;
    }

    fn signal_step(&mut self, fraction: f32, step: f32, bandlimited: bool) {
        if bandlimited {
            let p = fraction.clamp(START_OF_SAMPLE_FRACTION, 1.0) - 1.0;
            self.signal_blep.insert_discontinuity(p, step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    fn ctx() -> OuterContext {
        OuterContext::new(1.0 / SR)
    }

    fn linear_inputs() -> OuterChannelInputs {
        OuterChannelInputs {
            shape_knob: crate::dsp::warp::LINEAR_SHAPE,
            both_cv: BothCvFit::MEASURED.neutral_v,
            ..OuterChannelInputs::default()
        }
    }

    #[test]
    fn crossing_fraction() {
        assert_eq!(phase_crossing_fraction(1.0, 0.1), 1.0);
        assert!((phase_crossing_fraction(1.05, 0.1) - 0.5).abs() < 1e-6);
        assert_eq!(phase_crossing_fraction(3.0, 0.1), 0.0);
        assert_eq!(phase_crossing_fraction(1.5, 0.0), 1.0);
    }

    #[test]
    fn min_period_keeps_ratio() {
        let t = enforce_min_period(StageTimes { rise: 1e-4, fall: 3e-4 }, 1e-3);
        assert!((t.period() - 1e-3).abs() < 1e-9);
        assert!((t.fall / t.rise - 3.0).abs() < 1e-4);
        let slow = StageTimes { rise: 0.1, fall: 0.1 };
        assert_eq!(enforce_min_period(slow, 1e-3), slow);
    }

    #[test]
    fn idle_without_signal_stays_at_zero() {
        let mut ch = OuterChannelState::new();
        let inputs = linear_inputs();
        for _ in 0..10_000 {
            let o = ch.process(&OuterChannelConfig::CH1, &inputs, &ctx());
            assert_eq!(o.out, 0.0);
            assert_eq!(o.gate, 0.0);
        }
        assert_eq!(ch.phase(), OuterPhase::Idle);
    }

    #[test]
    fn trigger_runs_one_shot() {
        let mut ch = OuterChannelState::new();
        let cfg = OuterChannelConfig::CH4;
        let mut inputs = linear_inputs();
        ch.process(&cfg, &inputs, &ctx());

        inputs.trigger = 5.0;
        ch.process(&cfg, &inputs, &ctx());
        assert_eq!(ch.phase(), OuterPhase::Rise);
        // Channel 4 gate is high while rising.
        assert!(ch.gate_state());

        inputs.trigger = 0.0;
        let mut peak = 0.0f32;
        for _ in 0..200 {
            ch.process(&cfg, &inputs, &ctx());
            peak = peak.max(ch.out());
        }
        assert_eq!(peak, V_MAX);
        assert_eq!(ch.phase(), OuterPhase::Idle);
        assert_eq!(ch.out(), 0.0);
        assert!(!ch.gate_state());
    }

    #[test]
    fn cycle_button_toggles_latch() {
        let mut ch = OuterChannelState::new();
        let cfg = OuterChannelConfig::CH1;
        let mut inputs = linear_inputs();
        ch.process(&cfg, &inputs, &ctx());
        inputs.cycle_button = 1.0;
        let o = ch.process(&cfg, &inputs, &ctx());
        assert!(ch.cycle_latched() && o.cycle_on);
        inputs.cycle_button = 0.0;
        ch.process(&cfg, &inputs, &ctx());
        inputs.cycle_button = 1.0;
        ch.process(&cfg, &inputs, &ctx());
        assert!(!ch.cycle_latched());
    }

    #[test]
    fn cycle_cv_threshold() {
        let mut ch = OuterChannelState::new();
        let mut inputs = linear_inputs();
        inputs.cycle_cv = 2.4;
        assert!(!ch.process(&OuterChannelConfig::CH1, &inputs, &ctx()).cycle_on);
        inputs.cycle_cv = 2.5;
        assert!(ch.process(&OuterChannelConfig::CH1, &inputs, &ctx()).cycle_on);
        assert_eq!(ch.phase(), OuterPhase::Rise);
    }

    #[test]
    fn slew_follows_falling_target_without_overshoot() {
        let mut ch = OuterChannelState::new();
        ch.out = 8.0;
        let mut inputs = linear_inputs();
        inputs.signal = Some(-3.0);
        let mut prev = ch.out();
        for _ in 0..1000 {
            ch.process(&OuterChannelConfig::CH1, &inputs, &ctx());
            assert!(ch.out() <= prev);
            assert!(ch.out() >= -3.0);
            prev = ch.out();
        }
        assert_eq!(ch.out(), -3.0);
    }

    #[test]
    fn slew_segment_resets_on_reversal() {
        let mut ch = OuterChannelState::new();
        let mut inputs = linear_inputs();
        inputs.signal = Some(5.0);
        ch.process(&OuterChannelConfig::CH1, &inputs, &ctx());
        assert_eq!(ch.slew.dir, 1);
        inputs.signal = Some(-5.0);
        ch.process(&OuterChannelConfig::CH1, &inputs, &ctx());
        assert_eq!(ch.slew.dir, -1);
        assert_eq!(ch.slew.target, -5.0);
    }

    #[test]
    fn unpatching_drops_to_zero_with_correction() {
        let mut ch = OuterChannelState::new();
        let mut inputs = linear_inputs();
        inputs.signal = Some(4.0);
        for _ in 0..1000 {
            ch.process(&OuterChannelConfig::CH1, &inputs, &ctx());
        }
        inputs.signal = None;
        let o = ch.process(&OuterChannelConfig::CH1, &inputs, &ctx());
        assert_eq!(ch.out(), 0.0);
        assert!(o.out.abs() > 1e-3, "corrected out {}", o.out);
        let mut last = o.out;
        for _ in 0..64 {
            last = ch.process(&OuterChannelConfig::CH1, &inputs, &ctx()).out;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn slew_tracks_decaying_signal_into_underflow() {
        let mut ch = OuterChannelState::new();
        let cfg = OuterChannelConfig::CH1;
        let mut inputs = OuterChannelInputs {
            shape_knob: 0.0,
            both_cv: BothCvFit::MEASURED.neutral_v,
            ..OuterChannelInputs::default()
        };
        let mut v = 1.0f32;
        for i in 0..20_000 {
            inputs.signal = Some(v);
            let o = ch.process(&cfg, &inputs, &ctx());
            assert!(o.out.is_finite(), "sample {i}: signal {v:e} gave {}", o.out);
            assert!(ch.out().is_finite());
            v *= 0.99;
        }
        // Rounding parks the signal in the subnormal range.
        assert!(v < f32::MIN_POSITIVE);
        assert_eq!(ch.out(), v);
    }

    #[test]
    fn tiny_target_steps_land_without_a_segment() {
        let mut ch = OuterChannelState::new();
        let mut inputs = linear_inputs();
        inputs.shape_knob = 1.0;
        inputs.signal = Some(f32::MIN_POSITIVE * 0.25);
        ch.process(&OuterChannelConfig::CH1, &inputs, &ctx());
        assert_eq!(ch.out(), f32::MIN_POSITIVE * 0.25);
        assert_eq!(ch.slew.dir, 0);
    }

    #[test]
    fn idle_slew_step_has_no_injection() {
        let mut ch = OuterChannelState::new();
        let cfg = OuterChannelConfig::CH1;
        let mut inputs = linear_inputs();
        inputs.rise_knob = 0.5;
        inputs.signal = Some(5.0);
        ch.process(&cfg, &inputs, &ctx());
        assert_eq!(ch.phase(), OuterPhase::Idle);

        let key = StageTimeKey {
            rise_knob: inputs.rise_knob,
            fall_knob: inputs.fall_knob,
            shape: inputs.shape_knob,
            rise_cv: inputs.rise_cv,
            fall_cv: inputs.fall_cv,
            both_cv: inputs.both_cv,
        };
        let times =
            crate::outer::timing::stage_times_for(&key, cfg.shape_time, &BothCvFit::MEASURED);
        let s = shape_signed_from_knob(inputs.shape_knob);
        let dp = (1.0 / SR / times.rise).clamp(0.0, 0.5);
        let expected =
            dp * slope_warp(0.0, s) * crate::dsp::warp::slope_warp_scale(s) * V_RANGE;
        assert!(
            (ch.out() - expected).abs() < 1e-5,
            "step {} expected {expected}",
            ch.out()
        );
    }

    #[test]
    fn nonfinite_sample_time_freezes() {
        let mut ch = OuterChannelState::new();
        let mut inputs = linear_inputs();
        inputs.cycle_cv = 10.0;
        let bad = OuterContext::new(f32::NAN);
        for _ in 0..100 {
            let o = ch.process(&OuterChannelConfig::CH1, &inputs, &bad);
            assert!(o.out.is_finite() && o.gate.is_finite());
        }
        assert_eq!(ch.out(), 0.0);
    }
}
