use std::f32::consts::PI;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use integral_flux::engine::ports::{InputId, OutputId, ParamId, PortFrame};
use integral_flux::outer::OuterChannelId;
use integral_flux::{EngineSettings, FluxEngine, GATE_HIGH_V};

const SR: f32 = 48_000.0;
const FFT_SIZE: usize = 16_384;

fn render_eor(bandlimited: bool, rise: f32, fall: f32) -> Vec<f32> {
    let mut engine = FluxEngine::new(EngineSettings {
        bandlimited_gates: bandlimited,
        ..EngineSettings::default()
    });
    engine.set_cycle_latched(OuterChannelId::Ch1, true);

    let mut frame = PortFrame::new();
    frame.set_param(ParamId::Rise1, rise);
    frame.set_param(ParamId::Fall1, fall);
    frame.set_param(ParamId::Shape1, 0.33);
    frame.patch(InputId::BothCv1, -0.05);

    for _ in 0..4_800 {
        engine.process(&frame, 1.0 / SR);
    }
    (0..FFT_SIZE)
        .map(|_| engine.process(&frame, 1.0 / SR).get(OutputId::Eor1))
        .collect()
}

/// Hann-windowed power spectrum, bins 0..=N/2.
fn power_spectrum(samples: &[f32]) -> Vec<f32> {
    let n = samples.len();
    let mean = samples.iter().sum::<f32>() / n as f32;
    let mut buffer: Vec<Complex<f32>> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let w = 0.5 * (1.0 - (2.0 * PI * i as f32 / (n - 1) as f32).cos());
            Complex::new((s - mean) * w, 0.0)
        })
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    planner.plan_fft_forward(n).process(&mut buffer);
    buffer[..=n / 2].iter().map(|c| c.norm_sqr()).collect()
}

fn band_energy(spectrum: &[f32], lo_hz: f32, hi_hz: f32) -> f32 {
    let bin_hz = SR / FFT_SIZE as f32;
    spectrum
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let f = *i as f32 * bin_hz;
            f >= lo_hz && f <= hi_hz
        })
        .map(|(_, p)| p)
        .sum()
}

#[test]
fn band_limited_gate_has_less_energy_near_nyquist() {
    let naive = power_spectrum(&render_eor(false, 0.05, 0.07));
    let smooth = power_spectrum(&render_eor(true, 0.05, 0.07));

    let lo = 0.42 * SR;
    let hi = 0.5 * SR;
    let naive_top = band_energy(&naive, lo, hi);
    let smooth_top = band_energy(&smooth, lo, hi);
    assert!(
        smooth_top < 0.25 * naive_top,
        "near-Nyquist energy {smooth_top} vs naive {naive_top}"
    );

    // The fundamental region is essentially unchanged.
    let naive_low = band_energy(&naive, 100.0, 2_000.0);
    let smooth_low = band_energy(&smooth, 100.0, 2_000.0);
    assert!((smooth_low / naive_low - 1.0).abs() < 0.1);
}

#[test]
fn band_limited_gate_settles_on_the_rails() {
    let samples = render_eor(true, 0.3, 0.3);
    // Far from any edge the correction has drained away.
    let settled = samples
        .iter()
        .filter(|v| (**v - GATE_HIGH_V).abs() < 1e-2 || v.abs() < 1e-2)
        .count();
    assert!(settled > samples.len() / 2, "only {settled} settled samples");
}
