//! Cached stage times with control-rate throttling and interpolation.

use crate::dsp::stage_time::{compute_stage_time, shape_time_scale, BothCvFit, ShapeTimeCal};

/// Knob/shape change that invalidates cached stage times.
pub const PARAM_CACHE_EPS: f32 = 1e-4;
/// CV change that invalidates cached stage times.
pub const CV_CACHE_EPS: f32 = 1e-3;

/// Default stage time before the first evaluation (10 ms).
const DEFAULT_STAGE_TIME: f32 = 0.01;

/// Rise and fall duration in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTimes {
    pub rise: f32,
    pub fall: f32,
}

impl StageTimes {
    pub fn period(&self) -> f32 {
        self.rise + self.fall
    }
}

impl Default for StageTimes {
    fn default() -> Self {
        Self {
            rise: DEFAULT_STAGE_TIME,
            fall: DEFAULT_STAGE_TIME,
        }
    }
}

/// Input fingerprint the cached times were computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimeKey {
    pub rise_knob: f32,
    pub fall_knob: f32,
    pub shape: f32,
    pub rise_cv: f32,
    pub fall_cv: f32,
    pub both_cv: f32,
}

impl StageTimeKey {
    /// True when any control moved beyond its cache epsilon.
    #[inline]
    pub fn differs(&self, other: &StageTimeKey) -> bool {
        (self.rise_knob - other.rise_knob).abs() > PARAM_CACHE_EPS
            || (self.fall_knob - other.fall_knob).abs() > PARAM_CACHE_EPS
            || (self.shape - other.shape).abs() > PARAM_CACHE_EPS
            || (self.rise_cv - other.rise_cv).abs() > CV_CACHE_EPS
            || (self.fall_cv - other.fall_cv).abs() > CV_CACHE_EPS
            || (self.both_cv - other.both_cv).abs() > CV_CACHE_EPS
    }
}

/// Evaluate rise and fall times for a key, sharing the both/shape terms.
pub fn stage_times_for(key: &StageTimeKey, cal: ShapeTimeCal, fit: &BothCvFit) -> StageTimes {
    let both_scale = fit.time_scale(key.both_cv);
    let shape_scale = shape_time_scale(key.shape, cal);
    StageTimes {
        rise: compute_stage_time(key.rise_knob, key.rise_cv, both_scale, shape_scale),
        fall: compute_stage_time(key.fall_knob, key.fall_cv, both_scale, shape_scale),
    }
}

/// How a recompute is scheduled this sample.
#[derive(Debug, Clone, Copy)]
pub struct TimingClock {
    /// True on samples where control-rate timing may refresh.
    pub tick: bool,
    /// Control-rate divider (>= 1).
    pub divider: u32,
    /// Ramp active times towards new targets over `divider` samples.
    pub interpolate: bool,
}

impl TimingClock {
    /// Audio-rate timing: every sample may refresh, no ramping.
    pub const AUDIO_RATE: TimingClock = TimingClock {
        tick: true,
        divider: 1,
        interpolate: false,
    };
}

#[derive(Debug, Clone)]
pub struct StageTimeCache {
    valid: bool,
    key: StageTimeKey,
    target: StageTimes,
    active: StageTimes,
    step: StageTimes,
    interp_samples_left: u32,
}

impl StageTimeCache {
    pub fn new() -> Self {
        Self {
            valid: false,
            key: StageTimeKey::default(),
            target: StageTimes::default(),
            active: StageTimes::default(),
            step: StageTimes { rise: 0.0, fall: 0.0 },
            interp_samples_left: 0,
        }
    }

    /// Refresh if needed and return the active (possibly ramping) times.
    pub fn update(
        &mut self,
        key: StageTimeKey,
        cal: ShapeTimeCal,
        fit: &BothCvFit,
        clock: TimingClock,
    ) -> StageTimes {
        if (!self.valid || clock.tick) && (!self.valid || key.differs(&self.key)) {
            self.target = stage_times_for(&key, cal, fit);
            self.key = key;

            let divider = clock.divider.max(1);
            if self.valid && clock.interpolate && divider > 1 {
                let n = divider as f32;
                self.step = StageTimes {
                    rise: (self.target.rise - self.active.rise) / n,
                    fall: (self.target.fall - self.active.fall) / n,
                };
                self.interp_samples_left = divider;
            } else {
                self.snap_to_target();
            }
            self.valid = true;
        }

        self.advance();
        self.active
    }

    fn advance(&mut self) {
        if self.interp_samples_left == 0 {
            return;
        }
        self.active.rise += self.step.rise;
        self.active.fall += self.step.fall;
        self.interp_samples_left -= 1;
        if self.interp_samples_left == 0 {
            self.active = self.target;
        }
    }

    fn snap_to_target(&mut self) {
        self.active = self.target;
        self.step = StageTimes { rise: 0.0, fall: 0.0 };
        self.interp_samples_left = 0;
    }

    /// Force a recompute on the next update regardless of the clock.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Most recently computed times (what the controls ask for).
    pub fn target(&self) -> StageTimes {
        self.target
    }

    /// Times currently driving the integrator.
    pub fn active(&self) -> StageTimes {
        self.active
    }
}

impl Default for StageTimeCache {
    fn default() -> Self {
        Self::new()
    }
}
