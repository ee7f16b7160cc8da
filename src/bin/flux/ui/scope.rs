//! Oscilloscope widget for the unity outputs and the SUM bus

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use super::ScopeFrame;

fn trace(frames: &[ScopeFrame], pick: impl Fn(&ScopeFrame) -> f32) -> Vec<(f64, f64)> {
    let len = frames.len().max(1) as f64;
    frames
        .iter()
        .enumerate()
        .map(|(i, f)| (i as f64 / len, pick(f) as f64))
        .collect()
}

/// Render the scope over the most recent frames
pub fn render_scope(frame: &mut Frame, area: Rect, frames: &[ScopeFrame]) {
    let block = Block::default().title(" Scope ").borders(Borders::ALL);

    let ch1 = trace(frames, |f| f.unity1);
    let ch4 = trace(frames, |f| f.unity4);
    let sum = trace(frames, |f| f.sum);

    let datasets = vec![
        Dataset::default()
            .name("ch1")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&ch1),
        Dataset::default()
            .name("ch4")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&ch4),
        Dataset::default()
            .name("sum")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Magenta))
            .data(&sum),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-10.5, 10.5])
                .labels(vec!["-10V", "0V", "+10V"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
