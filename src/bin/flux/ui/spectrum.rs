//! Spectrum of channel 1's unity output
//!
//! Shows how much energy a cycling channel (and its band-limiting) puts
//! near Nyquist.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Points drawn across the log-frequency axis.
const DISPLAY_POINTS: usize = 64;
const LOWEST_HZ: f64 = 20.0;
const FLOOR_DB: f64 = -100.0;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// FFT bin for each display point
    bins: Vec<usize>,
    /// (log10 Hz, dB)
    points: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    pub fn new(size: usize, sample_rate: f32) -> Self {
        let size = size.max(2);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(size);

        let denom = (size - 1) as f32;
        let window = (0..size)
            .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / denom).cos()))
            .collect();

        let nyquist = (sample_rate as f64 / 2.0).max(LOWEST_HZ * 2.0);
        let half = size / 2;
        let mut bins = Vec::with_capacity(DISPLAY_POINTS);
        let mut points = Vec::with_capacity(DISPLAY_POINTS);
        for i in 0..DISPLAY_POINTS {
            let t = i as f64 / (DISPLAY_POINTS - 1) as f64;
            let hz = LOWEST_HZ * (nyquist / LOWEST_HZ).powf(t);
            let bin = ((hz * size as f64 / sample_rate as f64).round() as usize).clamp(1, half);
            bins.push(bin);
            points.push((hz.log10(), FLOOR_DB));
        }

        Self {
            fft,
            window,
            scratch: vec![Complex::new(0.0, 0.0); size],
            bins,
            points,
        }
    }

    pub fn size(&self) -> usize {
        self.window.len()
    }

    /// Recompute from the newest `size()` samples. Shorter input is ignored.
    pub fn update(&mut self, samples: &[f32]) {
        let n = self.window.len();
        if samples.len() < n {
            return;
        }
        let samples = &samples[samples.len() - n..];
        let mean = samples.iter().sum::<f32>() / n as f32;

        for ((slot, &s), &w) in self.scratch.iter_mut().zip(samples).zip(&self.window) {
            *slot = Complex::new((s - mean) * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = 1.0 / (n as f32 * n as f32);
        for (point, &bin) in self.points.iter_mut().zip(&self.bins) {
            let power = (self.scratch[bin].norm_sqr() * norm).max(1e-12);
            point.1 = (10.0 * (power as f64).log10()).max(FLOOR_DB);
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.points
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, points: &[(f64, f64)]) {
    let block = Block::default()
        .title(" Spectrum (ch1) ")
        .borders(Borders::ALL);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(points);

    let max_x = points.last().map(|p| p.0).unwrap_or(4.0);
    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([LOWEST_HZ.log10(), max_x])
                .labels(vec!["20", "200", "2k", "20k"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, 10.0])
                .labels(vec!["-100", "-45", "10"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_peaks_at_its_frequency() {
        let sr = 48_000.0;
        let mut analyzer = SpectrumAnalyzer::new(4096, sr);
        let samples: Vec<f32> = (0..4096)
            .map(|i| (std::f32::consts::TAU * 1000.0 * i as f32 / sr).sin())
            .collect();
        analyzer.update(&samples);

        let (peak_x, _) = analyzer
            .data()
            .iter()
            .copied()
            .fold((0.0, f64::MIN), |best, p| if p.1 > best.1 { p } else { best });
        let peak_hz = 10f64.powf(peak_x);
        assert!((800.0..1250.0).contains(&peak_hz), "peak at {peak_hz} Hz");
    }
}
