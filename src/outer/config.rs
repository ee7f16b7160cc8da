use crate::dsp::stage_time::ShapeTimeCal;
use crate::engine::ports::{InputId, ParamId, PortFrame};

/// Function-generator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OuterPhase {
    #[default]
    Idle,
    Rise,
    Fall,
}

/// Which of the two outer channels.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OuterChannelId {
    Ch1,
    Ch4,
}

impl OuterChannelId {
    pub const ALL: [OuterChannelId; 2] = [OuterChannelId::Ch1, OuterChannelId::Ch4];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            OuterChannelId::Ch1 => 0,
            OuterChannelId::Ch4 => 1,
        }
    }

    pub const fn config(self) -> &'static OuterChannelConfig {
        match self {
            OuterChannelId::Ch1 => &OuterChannelConfig::CH1,
            OuterChannelId::Ch4 => &OuterChannelConfig::CH4,
        }
    }
}

/// Static wiring and calibration of one outer channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OuterChannelConfig {
    pub name: &'static str,

    pub cycle_param: ParamId,
    pub rise_param: ParamId,
    pub fall_param: ParamId,
    pub shape_param: ParamId,

    pub trigger_input: InputId,
    pub signal_input: InputId,
    pub rise_cv_input: InputId,
    pub fall_cv_input: InputId,
    pub both_cv_input: InputId,
    pub cycle_cv_input: InputId,

    /// Shape-to-time multipliers measured at rise = fall = 0.
    pub shape_time: ShapeTimeCal,
    /// Phase during which the gate output is high.
    pub gate_high_phase: OuterPhase,
}

impl OuterChannelConfig {
    /// Channel 1: gate is end-of-rise, high while falling.
    pub const CH1: OuterChannelConfig = OuterChannelConfig {
        name: "ch1",
        cycle_param: ParamId::Cycle1,
        rise_param: ParamId::Rise1,
        fall_param: ParamId::Fall1,
        shape_param: ParamId::Shape1,
        trigger_input: InputId::Trigger1,
        signal_input: InputId::Signal1,
        rise_cv_input: InputId::RiseCv1,
        fall_cv_input: InputId::FallCv1,
        both_cv_input: InputId::BothCv1,
        cycle_cv_input: InputId::CycleCv1,
        shape_time: ShapeTimeCal {
            log_scale: 8.102198,
            exp_scale: 0.732835,
        },
        gate_high_phase: OuterPhase::Fall,
    };

    /// Channel 4: gate is end-of-cycle, high while rising.
    pub const CH4: OuterChannelConfig = OuterChannelConfig {
        name: "ch4",
        cycle_param: ParamId::Cycle4,
        rise_param: ParamId::Rise4,
        fall_param: ParamId::Fall4,
        shape_param: ParamId::Shape4,
        trigger_input: InputId::Trigger4,
        signal_input: InputId::Signal4,
        rise_cv_input: InputId::RiseCv4,
        fall_cv_input: InputId::FallCv4,
        both_cv_input: InputId::BothCv4,
        cycle_cv_input: InputId::CycleCv4,
        shape_time: ShapeTimeCal {
            log_scale: 7.672819,
            exp_scale: 0.690657,
        },
        gate_high_phase: OuterPhase::Rise,
    };

    /// Read this channel's controls out of a port frame.
    #[inline]
    pub fn read_inputs(&self, frame: &PortFrame) -> OuterChannelInputs {
        OuterChannelInputs {
            rise_knob: frame.param(self.rise_param),
            fall_knob: frame.param(self.fall_param),
            shape_knob: frame.param(self.shape_param),
            cycle_button: frame.param(self.cycle_param),
            rise_cv: frame.voltage(self.rise_cv_input),
            fall_cv: frame.voltage(self.fall_cv_input),
            both_cv: frame.voltage(self.both_cv_input),
            cycle_cv: frame.voltage(self.cycle_cv_input),
            trigger: frame.voltage(self.trigger_input),
            signal: frame.signal(self.signal_input),
        }
    }
}

/// One sample of controls for a single outer channel.
///
/// Unpatched CV inputs read 0 V; an unpatched signal input is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OuterChannelInputs {
    pub rise_knob: f32,
    pub fall_knob: f32,
    pub shape_knob: f32,
    pub cycle_button: f32,
    pub rise_cv: f32,
    pub fall_cv: f32,
    pub both_cv: f32,
    pub cycle_cv: f32,
    pub trigger: f32,
    pub signal: Option<f32>,
}
