//! flux - terminal front-end for the IntegralFlux engine
//!
//! Run with: cargo run --bin flux
//! Offline check: cargo run --bin flux -- --headless --cycle

mod app;
mod headless;
mod ui;

use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use integral_flux::EngineSettings;

#[derive(Parser, Debug)]
#[command(name = "flux")]
#[command(about = "Dual function generator / slew limiter with a mix bus", long_about = None)]
pub struct Cli {
    /// Render offline instead of opening an audio device
    #[arg(long)]
    headless: bool,

    /// Seconds to render in headless mode
    #[arg(long, default_value = "2.0")]
    seconds: f32,

    /// Sample rate in Hz for headless mode
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Rise knob (0-1) for both outer channels
    #[arg(long, default_value = "0.0")]
    rise: f32,

    /// Fall knob (0-1) for both outer channels
    #[arg(long, default_value = "0.0")]
    fall: f32,

    /// Shape knob (0 = LOG, 0.33 = linear, 1 = EXP)
    #[arg(long, default_value = "0.33")]
    shape: f32,

    /// Start with both outer channels cycling
    #[arg(long)]
    cycle: bool,

    /// Band-limit gate and signal discontinuities
    #[arg(long)]
    bandlimited: bool,

    /// Use hard clamps on the bus instead of soft saturation
    #[arg(long)]
    ideal_mix: bool,

    /// Refresh stage times every N samples
    #[arg(long, default_value = "1")]
    timing_div: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Write logs to this file (the TUI owns the terminal otherwise)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn settings(&self) -> EngineSettings {
        let mut settings = EngineSettings {
            ch1_cycle_latched: self.cycle,
            ch4_cycle_latched: self.cycle,
            bandlimited_gates: self.bandlimited,
            bandlimited_signals: self.bandlimited,
            timing_update_div: self.timing_div,
            ..EngineSettings::default()
        };
        settings.mix.enabled = !self.ideal_mix;
        settings
    }
}

fn init_logging(cli: &Cli) -> EyreResult<()> {
    let builder = tracing_subscriber::fmt().with_max_level(cli.log_level);
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if cli.headless => builder.with_writer(std::io::stderr).init(),
        None => {}
    }
    Ok(())
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(&cli)?;

    let settings = cli.settings();
    if cli.headless {
        headless::run(&cli, settings)
    } else {
        app::Flux::new(settings)
            .knobs(cli.rise, cli.fall, cli.shape)
            .run()
    }
}
