//! Flux - audio device setup and the realtime callback

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;
use tracing::{error, info};

use integral_flux::engine::message::ControlSender;
use integral_flux::{EngineSettings, FluxEngine, OutputId, ParamId, PortFrame, V_MAX};

use super::ui::{ScopeFrame, UiApp, SCOPE_CAPACITY};

/// Control messages the UI may queue between two audio callbacks.
const CONTROL_CAPACITY: usize = 256;

/// Main application builder
pub struct Flux {
    settings: EngineSettings,
    rise: f32,
    fall: f32,
    shape: f32,
}

impl Flux {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            rise: 0.0,
            fall: 0.0,
            shape: 0.33,
        }
    }

    /// Initial rise, fall and shape knobs for both outer channels
    pub fn knobs(mut self, rise: f32, fall: f32, shape: f32) -> Self {
        self.rise = rise;
        self.fall = fall;
        self.shape = shape;
        self
    }

    fn initial_frame(&self) -> PortFrame {
        let mut frame = PortFrame::new();
        for (rise, fall, shape) in [
            (ParamId::Rise1, ParamId::Fall1, ParamId::Shape1),
            (ParamId::Rise4, ParamId::Fall4, ParamId::Shape4),
        ] {
            frame.set_param(rise, self.rise);
            frame.set_param(fall, self.fall);
            frame.set_param(shape, self.shape);
        }
        frame
    }

    /// Open the default output device and run the TUI until it quits
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        info!(sample_rate, channels, "audio device opened");

        let mut engine = FluxEngine::new(self.settings.clone());
        let preview = engine.preview();
        let mut frame = self.initial_frame();
        let ui_frame = frame.clone();

        let (control_tx, mut control_rx) = ControlSender::channel(CONTROL_CAPACITY);
        let (mut scope_tx, scope_rx) = RingBuffer::<ScopeFrame>::new(SCOPE_CAPACITY);
        let dt = 1.0 / sample_rate;

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| {
                    engine.drain_messages(&mut control_rx, &mut frame);

                    for out_frame in data.chunks_mut(channels) {
                        let out = engine.process(&frame, dt);
                        let left = out.get(OutputId::Unity1);
                        let right = out.get(OutputId::Unity4);

                        // Dropped scope frames only thin the display.
                        let _ = scope_tx.push(ScopeFrame {
                            unity1: left,
                            unity4: right,
                            sum: out.get(OutputId::Sum),
                        });

                        // 0..V_MAX onto -1..1 so a cycling channel is audible.
                        let to_audio = |v: f32| (v / V_MAX * 2.0 - 1.0).clamp(-1.0, 1.0);
                        for (ch, sample) in out_frame.iter_mut().enumerate() {
                            *sample = if ch % 2 == 0 {
                                to_audio(left)
                            } else {
                                to_audio(right)
                            };
                        }
                    }
                },
                |err| error!(%err, "audio stream error"),
                None,
            )
            .wrap_err("failed to build output stream")?;
        stream.play().wrap_err("failed to start output stream")?;

        let mut terminal = ratatui::init();
        let mut app = UiApp::new(
            control_tx,
            scope_rx,
            preview,
            ui_frame,
            self.settings,
            sample_rate,
        );
        let result = app.run(&mut terminal);
        ratatui::restore();

        drop(stream);
        info!("flux stopped");
        result
    }
}
