use crate::dsp::{MinBlepGenerator, SchmittTrigger};
use crate::dsp::warp::WarpScaleCache;

use super::config::OuterPhase;
use super::timing::{StageTimeCache, StageTimes};
use super::{INJECTION_GAIN, INJECTION_TAU_S};

/// Linear-in-phase segment followed by the slew limiter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct SlewSegment {
    /// -1 falling, +1 rising, 0 settled.
    pub dir: i8,
    pub start: f32,
    pub target: f32,
    /// Signed 1 / (target - start).
    pub inv_span: f32,
}

/// One-pole injection coefficient, cached on the sample time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InjectionCoef {
    dt: f32,
    coef: f32,
}

impl InjectionCoef {
    const fn new() -> Self {
        Self { dt: -1.0, coef: 0.0 }
    }

    #[inline]
    pub fn get(&mut self, dt: f32) -> f32 {
        if dt != self.dt {
            self.dt = dt;
            self.coef = INJECTION_GAIN * (1.0 - (-dt / INJECTION_TAU_S).exp());
        }
        self.coef
    }
}

/// Continuous state of one outer channel.
///
/// Only `cycle_latched` is meant to survive a save/restore; everything else
/// cold-starts idle at 0 V.
#[derive(Debug, Clone)]
pub struct OuterChannelState {
    pub(crate) phase: OuterPhase,
    pub(crate) phase_pos: f32,
    pub(crate) out: f32,
    pub(crate) slew: SlewSegment,

    pub(crate) cycle_latched: bool,
    pub(crate) gate_state: bool,
    /// The running cycle was started by a trigger edge.
    pub(crate) trigger_driven: bool,
    pub(crate) rearm_timer: f32,

    pub(crate) trigger_edge: SchmittTrigger,
    pub(crate) cycle_button_edge: SchmittTrigger,

    pub(crate) gate_blep: MinBlepGenerator,
    pub(crate) signal_blep: MinBlepGenerator,

    pub(crate) warp: WarpScaleCache,
    pub(crate) timing: StageTimeCache,
    pub(crate) injection: InjectionCoef,
    /// Signed shape seen on the last processed sample.
    pub(crate) shape_signed: f32,
}

impl OuterChannelState {
    pub fn new() -> Self {
        Self {
            phase: OuterPhase::Idle,
            phase_pos: 0.0,
            out: 0.0,
            slew: SlewSegment::default(),
            cycle_latched: false,
            gate_state: false,
            trigger_driven: false,
            rearm_timer: 0.0,
            trigger_edge: SchmittTrigger::default(),
            cycle_button_edge: SchmittTrigger::default(),
            gate_blep: MinBlepGenerator::new(),
            signal_blep: MinBlepGenerator::new(),
            warp: WarpScaleCache::new(),
            timing: StageTimeCache::new(),
            injection: InjectionCoef::new(),
            shape_signed: 0.0,
        }
    }

    /// Cold start: idle at 0 V with empty caches. Keeps the cycle latch.
    pub fn reset(&mut self) {
        let cycle_latched = self.cycle_latched;
        *self = Self::new();
        self.cycle_latched = cycle_latched;
    }

    pub fn phase(&self) -> OuterPhase {
        self.phase
    }

    /// Progress through the current stage.
    pub fn phase_pos(&self) -> f32 {
        self.phase_pos
    }

    /// Naive channel voltage, without band-limiting correction.
    pub fn out(&self) -> f32 {
        self.out
    }

    pub fn gate_state(&self) -> bool {
        self.gate_state
    }

    pub fn cycle_latched(&self) -> bool {
        self.cycle_latched
    }

    pub fn set_cycle_latched(&mut self, latched: bool) {
        self.cycle_latched = latched;
    }

    /// Stage times the controls currently ask for.
    pub fn target_times(&self) -> StageTimes {
        self.timing.target()
    }

    /// Stage times currently driving the integrator.
    pub fn active_times(&self) -> StageTimes {
        self.timing.active()
    }

    pub fn shape_signed(&self) -> f32 {
        self.shape_signed
    }

    /// Drop cached stage times so the next sample recomputes them.
    pub fn invalidate_timing(&mut self) {
        self.timing.invalidate();
    }
}

impl Default for OuterChannelState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_at_zero() {
        let state = OuterChannelState::new();
        assert_eq!(state.phase(), OuterPhase::Idle);
        assert_eq!(state.out(), 0.0);
        assert!(!state.gate_state());
        assert_eq!(state.active_times(), StageTimes::default());
    }

    #[test]
    fn reset_keeps_only_the_latch() {
        let mut state = OuterChannelState::new();
        state.set_cycle_latched(true);
        state.phase = OuterPhase::Fall;
        state.out = 7.0;
        state.reset();
        assert!(state.cycle_latched());
        assert_eq!(state.phase(), OuterPhase::Idle);
        assert_eq!(state.out(), 0.0);
    }

    #[test]
    fn injection_coefficient_tracks_sample_time() {
        let mut coef = InjectionCoef::new();
        let a = coef.get(1.0 / 48_000.0);
        let b = coef.get(1.0 / 96_000.0);
        assert!(a > b && b > 0.0);
        assert!(a < INJECTION_GAIN);
        assert_eq!(coef.get(0.0), 0.0);
    }
}
