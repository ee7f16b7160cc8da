//! The four-channel module: two outer function generators, two attenuverted
//! pass-through channels and the SUM / OR / INV bus.
//!
//! [`FluxEngine::process`] runs once per sample on the audio thread. It does
//! not allocate, lock or log. Settings arrive either through the setters or as
//! [`message::ControlMessage`]s drained at the top of a block.

pub mod message;
pub mod ports;
pub mod settings;

use tracing::{debug, info};

use crate::dsp::mix::{attenuverter_gain, mix_bus, MixNonIdealCal, BUS_LIMIT_V};
use crate::dsp::taper::KnobTaper;
use crate::dsp::minblep;
use crate::outer::{
    OuterChannelId, OuterChannelOutput, OuterChannelState, OuterContext, TimingClock, V_MAX,
};
use crate::preview::{PreviewBoard, PreviewKnobs, PreviewPublisher};

use self::message::{ControlMessage, MessageReceiver};
use self::ports::{FrameOutputs, InputId, LightId, OutputId, ParamId, PortFrame};
use self::settings::EngineSettings;

/// Lights refresh at 120 Hz.
pub const LIGHT_UPDATE_INTERVAL_S: f32 = 1.0 / 120.0;
/// Channel 2 source when its input is unpatched.
pub const CH2_NORMAL_V: f32 = 10.0;
/// Channel 3 source when its input is unpatched.
pub const CH3_NORMAL_V: f32 = 5.0;
/// Variable outputs clamp to ± this.
pub const VARIABLE_LIMIT_V: f32 = 10.0;

pub struct FluxEngine {
    settings: EngineSettings,
    channels: [OuterChannelState; 2],
    publishers: [PreviewPublisher; 2],
    preview: PreviewBoard,
    timing_counter: u32,
    light_timer: f32,
    lights: [f32; LightId::COUNT],
}

impl FluxEngine {
    pub fn new(settings: EngineSettings) -> Self {
        // Build the lookup tables here, not on the audio thread.
        KnobTaper::shared();
        minblep::shared_table();

        let settings = settings.sanitized();
        info!(
            timing_update_div = settings.timing_update_div,
            bandlimited_gates = settings.bandlimited_gates,
            bandlimited_signals = settings.bandlimited_signals,
            mix_non_ideal = settings.mix.enabled,
            "flux engine created"
        );

        let mut channels = [OuterChannelState::new(), OuterChannelState::new()];
        channels[OuterChannelId::Ch1.index()].set_cycle_latched(settings.ch1_cycle_latched);
        channels[OuterChannelId::Ch4.index()].set_cycle_latched(settings.ch4_cycle_latched);

        let preview = PreviewBoard::new();
        let publishers = OuterChannelId::ALL
            .map(|id| PreviewPublisher::new(preview.shared(id).clone()));

        Self {
            settings,
            channels,
            publishers,
            preview,
            timing_counter: 0,
            light_timer: 0.0,
            lights: [0.0; LightId::COUNT],
        }
    }

    /// Current settings, including each channel's cycle latch.
    pub fn settings(&self) -> EngineSettings {
        let mut settings = self.settings.clone();
        settings.ch1_cycle_latched = self.cycle_latched(OuterChannelId::Ch1);
        settings.ch4_cycle_latched = self.cycle_latched(OuterChannelId::Ch4);
        settings
    }

    /// Replace every setting. Caches are invalidated when the divider changes.
    pub fn apply_settings(&mut self, settings: EngineSettings) {
        let settings = settings.sanitized();
        debug!(?settings, "applying engine settings");
        self.set_cycle_latched(OuterChannelId::Ch1, settings.ch1_cycle_latched);
        self.set_cycle_latched(OuterChannelId::Ch4, settings.ch4_cycle_latched);
        let div = settings.timing_update_div;
        self.settings = settings;
        self.set_timing_update_div(div);
    }

    pub fn channel(&self, id: OuterChannelId) -> &OuterChannelState {
        &self.channels[id.index()]
    }

    pub fn cycle_latched(&self, id: OuterChannelId) -> bool {
        self.channels[id.index()].cycle_latched()
    }

    pub fn set_cycle_latched(&mut self, id: OuterChannelId, latched: bool) {
        self.channels[id.index()].set_cycle_latched(latched);
    }

    pub fn set_mix_non_ideal(&mut self, enabled: bool) {
        self.settings.mix.enabled = enabled;
    }

    /// Replace the bus calibration, keeping the current mixing mode.
    /// Calibrations with non-finite or non-positive values are ignored.
    pub fn set_mix_cal(&mut self, cal: MixNonIdealCal) {
        if cal.is_valid() {
            self.settings.mix = MixNonIdealCal {
                enabled: self.settings.mix.enabled,
                ..cal
            };
        }
    }

    pub fn set_bandlimited_gates(&mut self, enabled: bool) {
        self.settings.bandlimited_gates = enabled;
    }

    pub fn set_bandlimited_signals(&mut self, enabled: bool) {
        self.settings.bandlimited_signals = enabled;
    }

    pub fn set_timing_interpolate(&mut self, enabled: bool) {
        self.settings.timing_interpolate = enabled;
    }

    /// Set the control-rate divider (floored to 1). Restarts the divider
    /// count and drops both channels' cached stage times.
    pub fn set_timing_update_div(&mut self, div: u32) {
        self.settings.timing_update_div = div.max(1);
        self.timing_counter = 0;
        for ch in &mut self.channels {
            ch.invalidate_timing();
        }
    }

    /// Read side of the timing preview, for a display thread.
    pub fn preview(&self) -> PreviewBoard {
        self.preview.clone()
    }

    /// Cold start every channel. Cycle latches and settings survive.
    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.reset();
        }
        for publisher in &mut self.publishers {
            publisher.force_next();
        }
        self.timing_counter = 0;
        self.light_timer = 0.0;
        self.lights = [0.0; LightId::COUNT];
    }

    /// Apply one engine-level message. Port messages are ignored here.
    pub fn apply(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::SetCycleLatched { channel, latched } => {
                self.set_cycle_latched(channel, latched)
            }
            ControlMessage::SetMixNonIdeal(enabled) => self.set_mix_non_ideal(enabled),
            ControlMessage::SetMixCal(cal) => self.set_mix_cal(cal),
            ControlMessage::SetBandlimitedGates(enabled) => self.set_bandlimited_gates(enabled),
            ControlMessage::SetBandlimitedSignals(enabled) => self.set_bandlimited_signals(enabled),
            ControlMessage::SetTimingInterpolate(enabled) => self.set_timing_interpolate(enabled),
            ControlMessage::SetTimingUpdateDiv(div) => self.set_timing_update_div(div),
            ControlMessage::Reset => self.reset(),
            ControlMessage::SetParam { .. }
            | ControlMessage::Patch { .. }
            | ControlMessage::Unpatch { .. }
            | ControlMessage::SetOutputConnected { .. } => {}
        }
    }

    /// Drain every pending message, routing port changes into `frame`.
    pub fn drain_messages<R: MessageReceiver + ?Sized>(
        &mut self,
        rx: &mut R,
        frame: &mut PortFrame,
    ) -> usize {
        let mut count = 0;
        while let Some(msg) = rx.pop() {
            if !msg.apply_to_frame(frame) {
                self.apply(msg);
            }
            count += 1;
        }
        count
    }

    #[inline]
    fn timing_tick(&mut self) -> bool {
        let div = self.settings.timing_update_div;
        if div <= 1 {
            return true;
        }
        self.timing_counter += 1;
        if self.timing_counter >= div {
            self.timing_counter = 0;
            true
        } else {
            false
        }
    }

    #[inline]
    fn light_tick(&mut self, sample_time: f32) -> bool {
        if !sample_time.is_finite() || sample_time <= 0.0 {
            return false;
        }
        self.light_timer += sample_time;
        if self.light_timer < LIGHT_UPDATE_INTERVAL_S {
            return false;
        }
        self.light_timer -= LIGHT_UPDATE_INTERVAL_S;
        if self.light_timer >= LIGHT_UPDATE_INTERVAL_S {
            self.light_timer = 0.0;
        }
        true
    }

    /// Process one sample.
    pub fn process(&mut self, frame: &PortFrame, sample_time: f32) -> FrameOutputs {
        let ctx = OuterContext {
            sample_time,
            timing: TimingClock {
                tick: self.timing_tick(),
                divider: self.settings.timing_update_div,
                interpolate: self.settings.timing_interpolate,
            },
            bandlimited_gates: self.settings.bandlimited_gates,
            bandlimited_signals: self.settings.bandlimited_signals,
        };

        let mut results = [OuterChannelOutput::default(); 2];
        for id in OuterChannelId::ALL {
            let i = id.index();
            let cfg = id.config();
            let inputs = cfg.read_inputs(frame);
            results[i] = self.channels[i].process(cfg, &inputs, &ctx);

            let ch = &self.channels[i];
            self.publishers[i].update(
                sample_time,
                PreviewKnobs {
                    rise: inputs.rise_knob,
                    fall: inputs.fall_knob,
                    shape: inputs.shape_knob,
                },
                ch.target_times(),
                ch.shape_signed(),
            );
        }
        let ch1 = results[OuterChannelId::Ch1.index()];
        let ch4 = results[OuterChannelId::Ch4.index()];

        let variable = |source: f32, atten: ParamId| {
            (source * attenuverter_gain(frame.param(atten)))
                .clamp(-VARIABLE_LIMIT_V, VARIABLE_LIMIT_V)
        };
        let ch2_source = frame.signal(InputId::Signal2).unwrap_or(CH2_NORMAL_V);
        let ch3_source = frame.signal(InputId::Signal3).unwrap_or(CH3_NORMAL_V);
        let vars = [
            variable(ch1.out, ParamId::Atten1),
            variable(ch2_source, ParamId::Atten2),
            variable(ch3_source, ParamId::Atten3),
            variable(ch4.out, ParamId::Atten4),
        ];
        let patched = OutputId::VARIABLE.map(|id| frame.is_output_connected(id));
        let bus = mix_bus(&vars, &patched, &self.settings.mix);

        let mut out = FrameOutputs::default();
        for (id, v) in OutputId::VARIABLE.into_iter().zip(vars) {
            out.set(id, v);
        }
        out.set(OutputId::Unity1, ch1.out);
        out.set(OutputId::Unity4, ch4.out);
        out.set(OutputId::Eor1, ch1.gate);
        out.set(OutputId::Eoc4, ch4.gate);
        out.set(OutputId::Sum, bus.sum);
        out.set(OutputId::Or, bus.or);
        out.set(OutputId::Inv, bus.inv);

        if self.light_tick(sample_time) {
            let on = |b: bool| if b { 1.0 } else { 0.0 };
            let lights = &mut self.lights;
            lights[LightId::Cycle1.index()] = on(ch1.cycle_on);
            lights[LightId::Cycle4.index()] = on(ch4.cycle_on);
            lights[LightId::Eor1.index()] = on(ch1.gate_high);
            lights[LightId::Eoc4.index()] = on(ch4.gate_high);
            lights[LightId::Unity1.index()] = (ch1.out.abs() / V_MAX).clamp(0.0, 1.0);
            lights[LightId::Unity4.index()] = (ch4.out.abs() / V_MAX).clamp(0.0, 1.0);
            lights[LightId::Or.index()] = (bus.or / BUS_LIMIT_V).clamp(0.0, 1.0);
            lights[LightId::Inv.index()] = (bus.inv.abs() / BUS_LIMIT_V).clamp(0.0, 1.0);
        }
        out.lights = self.lights;

        out
    }
}

impl Default for FluxEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}
