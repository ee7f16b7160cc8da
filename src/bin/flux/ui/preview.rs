//! One-cycle preview of an outer channel, drawn from the published
//! stage times and shape.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use integral_flux::dsp::warp::{slope_warp, slope_warp_scale};
use integral_flux::outer::OuterChannelId;
use integral_flux::preview::PreviewSnapshot;
use integral_flux::{V_MAX, V_MIN};

/// Integration steps per stage.
const STEPS_PER_STAGE: usize = 64;

/// Integrate one rise followed by one fall the way the engine does,
/// returning (milliseconds, volts) points.
pub fn cycle_curve(snapshot: &PreviewSnapshot) -> Vec<(f64, f64)> {
    let s = snapshot.shape_signed;
    let scale = slope_warp_scale(s);
    let dp = 1.0 / STEPS_PER_STAGE as f32;
    let volts = |x: f32| (V_MIN + x * (V_MAX - V_MIN)) as f64;

    let mut points = Vec::with_capacity(2 * STEPS_PER_STAGE + 2);
    let mut x = 0.0f32;
    points.push((0.0, volts(x)));
    for (stage_ms, rising) in [
        (snapshot.rise_time as f64 * 1000.0, true),
        (snapshot.fall_time as f64 * 1000.0, false),
    ] {
        let start_ms = points.last().map(|p| p.0).unwrap_or(0.0);
        for i in 1..=STEPS_PER_STAGE {
            let dx = dp * slope_warp(x, s) * scale;
            x = (if rising { x + dx } else { x - dx }).clamp(0.0, 1.0);
            let t = start_ms + stage_ms * i as f64 / STEPS_PER_STAGE as f64;
            points.push((t, volts(x)));
        }
        // Stages end on the rails even if the warp ran short.
        x = if rising { 1.0 } else { 0.0 };
        if let Some(last) = points.last_mut() {
            last.1 = volts(x);
        }
    }
    points
}

fn format_time(seconds: f32) -> String {
    if seconds < 1.0 {
        format!("{:.2}ms", seconds * 1000.0)
    } else {
        format!("{seconds:.2}s")
    }
}

pub fn render_preview(
    frame: &mut Frame,
    area: Rect,
    channel: OuterChannelId,
    snapshot: &PreviewSnapshot,
    selected: bool,
) {
    let title = format!(
        " {} rise {} fall {}{} ",
        channel.config().name,
        format_time(snapshot.rise_time),
        format_time(snapshot.fall_time),
        if snapshot.interactive { " *" } else { "" },
    );
    let border = if selected { Color::White } else { Color::DarkGray };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let points = cycle_curve(snapshot);
    let total_ms = points.last().map(|p| p.0).unwrap_or(1.0).max(1e-3);
    let color = match channel {
        OuterChannelId::Ch1 => Color::Cyan,
        OuterChannelId::Ch4 => Color::Yellow,
    };
    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, total_ms])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([V_MIN as f64, V_MAX as f64])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
