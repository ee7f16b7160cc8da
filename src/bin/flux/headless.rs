//! Offline render: run the engine without an audio device and report what
//! the outer channels did.

use color_eyre::eyre::{eyre, Result as EyreResult};
use tracing::{debug, info};

use integral_flux::outer::OuterChannelId;
use integral_flux::{EngineSettings, FluxEngine, OutputId, ParamId, PortFrame};

use super::Cli;

/// Per-channel measurements over the render.
#[derive(Debug, Default)]
struct ChannelReport {
    gate_edges: u32,
    peak: f32,
    trough: f32,
}

impl ChannelReport {
    fn observe(&mut self, out: f32, gate_rose: bool) {
        if gate_rose {
            self.gate_edges += 1;
        }
        self.peak = self.peak.max(out);
        self.trough = self.trough.min(out);
    }
}

pub fn run(cli: &Cli, settings: EngineSettings) -> EyreResult<()> {
    if !(cli.seconds.is_finite() && cli.seconds > 0.0) {
        return Err(eyre!("--seconds must be positive, got {}", cli.seconds));
    }
    if cli.sample_rate == 0 {
        return Err(eyre!("--sample-rate must be positive"));
    }

    let sample_rate = cli.sample_rate as f32;
    let dt = 1.0 / sample_rate;
    let total = (cli.seconds * sample_rate) as usize;

    let mut engine = FluxEngine::new(settings);
    let mut frame = PortFrame::new();
    for (rise, fall, shape) in [
        (ParamId::Rise1, ParamId::Fall1, ParamId::Shape1),
        (ParamId::Rise4, ParamId::Fall4, ParamId::Shape4),
    ] {
        frame.set_param(rise, cli.rise);
        frame.set_param(fall, cli.fall);
        frame.set_param(shape, cli.shape);
    }
    info!(samples = total, sample_rate, "rendering offline");

    let mut reports = [ChannelReport::default(), ChannelReport::default()];
    let mut gates = [false; 2];
    let mut sum_peak = 0.0f32;
    for _ in 0..total {
        let out = engine.process(&frame, dt);
        for (i, (unity, gate)) in [
            (OutputId::Unity1, OutputId::Eor1),
            (OutputId::Unity4, OutputId::Eoc4),
        ]
        .into_iter()
        .enumerate()
        {
            let high = out.get(gate) >= 5.0;
            reports[i].observe(out.get(unity), high && !gates[i]);
            gates[i] = high;
        }
        sum_peak = sum_peak.max(out.get(OutputId::Sum).abs());
    }

    let board = engine.preview();
    for id in OuterChannelId::ALL {
        let report = &reports[id.index()];
        let times = engine.channel(id).target_times();
        debug!(?id, ?report, "channel report");
        println!(
            "{}: rise {:.3} ms, fall {:.3} ms, {:.2} Hz measured, range {:.3}..{:.3} V, preview v{}",
            id.config().name,
            times.rise * 1000.0,
            times.fall * 1000.0,
            report.gate_edges as f32 / cli.seconds,
            report.trough,
            report.peak,
            board.snapshot(id).version,
        );
    }
    println!("bus: |SUM| peak {sum_peak:.3} V");

    Ok(())
}
