//! Status bar - selected channel and knob, settings flags, output levels

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::controls::{ControlPanel, Field};
use super::ScopeFrame;

/// Output levels over the visible scope window
pub struct OutputStats {
    pub ch1_peak: f32,
    pub ch4_peak: f32,
    pub sum_peak: f32,
}

impl OutputStats {
    pub fn from_frames(frames: &[ScopeFrame]) -> Self {
        let peak = |pick: fn(&ScopeFrame) -> f32| {
            frames.iter().fold(0.0f32, |acc, f| acc.max(pick(f).abs()))
        };
        Self {
            ch1_peak: peak(|f| f.unity1),
            ch4_peak: peak(|f| f.unity4),
            sum_peak: peak(|f| f.sum),
        }
    }
}

fn flag(name: &str, on: bool) -> Span<'static> {
    Span::styled(
        format!("{name}:{}  ", if on { "on" } else { "off" }),
        Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
    )
}

pub fn render_status(
    frame: &mut Frame,
    area: Rect,
    panel: &ControlPanel,
    stats: &OutputStats,
    sample_rate: f32,
) {
    let block = Block::default().title(" flux ").borders(Borders::ALL);

    let mut spans = vec![Span::styled(
        format!(" {}  ", panel.channel.config().name),
        Style::default().fg(Color::Cyan),
    )];
    for field in Field::ALL {
        let style = if field == panel.field {
            Style::default().fg(Color::Black).bg(Color::White)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(
            format!("{} {:.2}", field.label(), panel.value(panel.channel, field)),
            style,
        ));
        spans.push(Span::raw("  "));
    }

    let settings = &panel.settings;
    spans.push(flag("cycle", panel.cycle_latched(panel.channel)));
    spans.push(flag("blep-gate", settings.bandlimited_gates));
    spans.push(flag("blep-sig", settings.bandlimited_signals));
    spans.push(flag("soft-mix", settings.mix.enabled));
    spans.push(flag("interp", settings.timing_interpolate));
    spans.push(Span::styled(
        format!("div:{}  ", settings.timing_update_div),
        Style::default().fg(Color::White),
    ));
    spans.push(Span::styled(
        format!("{:.1}kHz  ", sample_rate / 1000.0),
        Style::default().fg(Color::DarkGray),
    ));
    spans.push(Span::styled(
        format!(
            "ch1 {:.2}V  ch4 {:.2}V  sum {:.2}V",
            stats.ch1_peak, stats.ch4_peak, stats.sum_peak
        ),
        Style::default().fg(Color::Magenta),
    ));

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}
