//! Keyboard-driven panel: which knob is selected, what it is set to, and
//! the control messages each key press turns into.

use crossterm::event::KeyCode;

use integral_flux::engine::message::ControlMessage;
use integral_flux::engine::settings::TIMING_UPDATE_DIVIDERS;
use integral_flux::outer::OuterChannelId;
use integral_flux::{EngineSettings, InputId, ParamId, PortFrame};

/// Knob step for one arrow press.
const KNOB_STEP: f32 = 0.01;
/// Knob step with the coarse keys.
const KNOB_COARSE_STEP: f32 = 0.1;
/// Voltage held on a trigger input for one UI frame.
const TRIGGER_PULSE_V: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Rise,
    Fall,
    Shape,
    Atten,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Rise, Field::Fall, Field::Shape, Field::Atten];

    pub fn label(self) -> &'static str {
        match self {
            Field::Rise => "rise",
            Field::Fall => "fall",
            Field::Shape => "shape",
            Field::Atten => "atten",
        }
    }

    fn param(self, channel: OuterChannelId) -> ParamId {
        let cfg = channel.config();
        match (self, channel) {
            (Field::Rise, _) => cfg.rise_param,
            (Field::Fall, _) => cfg.fall_param,
            (Field::Shape, _) => cfg.shape_param,
            (Field::Atten, OuterChannelId::Ch1) => ParamId::Atten1,
            (Field::Atten, OuterChannelId::Ch4) => ParamId::Atten4,
        }
    }
}

/// UI-side mirror of what has been sent to the engine.
#[derive(Debug, Clone)]
pub struct ControlPanel {
    pub channel: OuterChannelId,
    pub field: Field,
    pub settings: EngineSettings,
    params: [f32; ParamId::COUNT],
    pending_release: Option<InputId>,
}

impl ControlPanel {
    pub fn new(frame: &PortFrame, settings: EngineSettings) -> Self {
        let mut params = [0.0; ParamId::COUNT];
        for id in ParamId::ALL {
            params[id.index()] = frame.param(id);
        }
        Self {
            channel: OuterChannelId::Ch1,
            field: Field::Rise,
            settings,
            params,
            pending_release: None,
        }
    }

    pub fn value(&self, channel: OuterChannelId, field: Field) -> f32 {
        self.params[field.param(channel).index()]
    }

    pub fn cycle_latched(&self, channel: OuterChannelId) -> bool {
        match channel {
            OuterChannelId::Ch1 => self.settings.ch1_cycle_latched,
            OuterChannelId::Ch4 => self.settings.ch4_cycle_latched,
        }
    }

    /// Messages due at the start of a UI frame (trigger releases).
    pub fn tick(&mut self, out: &mut Vec<ControlMessage>) {
        if let Some(id) = self.pending_release.take() {
            out.push(ControlMessage::Patch { id, voltage: 0.0 });
        }
    }

    /// Translate a key press. Returns true when the UI should quit.
    pub fn handle_key(&mut self, key: KeyCode, out: &mut Vec<ControlMessage>) -> bool {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return true,
            KeyCode::Tab => {
                self.channel = match self.channel {
                    OuterChannelId::Ch1 => OuterChannelId::Ch4,
                    OuterChannelId::Ch4 => OuterChannelId::Ch1,
                };
            }
            KeyCode::Up => self.select(-1),
            KeyCode::Down => self.select(1),
            KeyCode::Left => self.nudge(-KNOB_STEP, out),
            KeyCode::Right => self.nudge(KNOB_STEP, out),
            KeyCode::PageDown => self.nudge(-KNOB_COARSE_STEP, out),
            KeyCode::PageUp => self.nudge(KNOB_COARSE_STEP, out),
            KeyCode::Char('c') => {
                let latched = !self.cycle_latched(self.channel);
                match self.channel {
                    OuterChannelId::Ch1 => self.settings.ch1_cycle_latched = latched,
                    OuterChannelId::Ch4 => self.settings.ch4_cycle_latched = latched,
                }
                out.push(ControlMessage::SetCycleLatched {
                    channel: self.channel,
                    latched,
                });
            }
            KeyCode::Char('t') => {
                let id = self.channel.config().trigger_input;
                out.push(ControlMessage::Patch {
                    id,
                    voltage: TRIGGER_PULSE_V,
                });
                self.pending_release = Some(id);
            }
            KeyCode::Char('g') => {
                self.settings.bandlimited_gates = !self.settings.bandlimited_gates;
                out.push(ControlMessage::SetBandlimitedGates(
                    self.settings.bandlimited_gates,
                ));
            }
            KeyCode::Char('s') => {
                self.settings.bandlimited_signals = !self.settings.bandlimited_signals;
                out.push(ControlMessage::SetBandlimitedSignals(
                    self.settings.bandlimited_signals,
                ));
            }
            KeyCode::Char('m') => {
                self.settings.mix.enabled = !self.settings.mix.enabled;
                out.push(ControlMessage::SetMixNonIdeal(self.settings.mix.enabled));
            }
            KeyCode::Char('i') => {
                self.settings.timing_interpolate = !self.settings.timing_interpolate;
                out.push(ControlMessage::SetTimingInterpolate(
                    self.settings.timing_interpolate,
                ));
            }
            KeyCode::Char('d') => {
                let div = next_divider(self.settings.timing_update_div);
                self.settings.timing_update_div = div;
                out.push(ControlMessage::SetTimingUpdateDiv(div));
            }
            KeyCode::Char('x') => out.push(ControlMessage::Reset),
            _ => {}
        }
        false
    }

    fn select(&mut self, delta: isize) {
        let n = Field::ALL.len() as isize;
        let i = Field::ALL
            .iter()
            .position(|f| *f == self.field)
            .unwrap_or(0) as isize;
        self.field = Field::ALL[(i + delta).rem_euclid(n) as usize];
    }

    fn nudge(&mut self, delta: f32, out: &mut Vec<ControlMessage>) {
        let id = self.field.param(self.channel);
        let value = (self.params[id.index()] + delta).clamp(0.0, 1.0);
        self.params[id.index()] = value;
        out.push(ControlMessage::SetParam { id, value });
    }
}

/// Next entry in the divider menu, wrapping to the first.
fn next_divider(current: u32) -> u32 {
    TIMING_UPDATE_DIVIDERS
        .iter()
        .copied()
        .find(|&d| d > current)
        .unwrap_or(TIMING_UPDATE_DIVIDERS[0])
}
