//! TUI module for flux
//!
//! Keyboard control of the outer channels, a live scope of the outputs and
//! the timing preview published by the engine.

mod controls;
mod preview;
mod scope;
mod spectrum;
mod status;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

use integral_flux::engine::message::{ControlMessage, ControlSender};
use integral_flux::outer::OuterChannelId;
use integral_flux::preview::PreviewBoard;
use integral_flux::{EngineSettings, PortFrame};

use controls::ControlPanel;
use preview::render_preview;
use scope::render_scope;
use spectrum::{render_spectrum, SpectrumAnalyzer};
use status::{render_status, OutputStats};

/// Scope frames the audio thread may queue between UI frames.
pub const SCOPE_CAPACITY: usize = 16_384;
/// Frames kept for drawing.
const SCOPE_WINDOW: usize = 2048;
/// FFT length for the spectrum view.
const SPECTRUM_SIZE: usize = 4096;

/// One sample of the outputs the UI draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeFrame {
    pub unity1: f32,
    pub unity4: f32,
    pub sum: f32,
}

/// UI application state
pub struct UiApp {
    control_tx: ControlSender,
    scope_rx: Consumer<ScopeFrame>,
    preview: PreviewBoard,
    panel: ControlPanel,
    /// Most recent frames, oldest first
    history: VecDeque<ScopeFrame>,
    spectrum: SpectrumAnalyzer,
    sample_rate: f32,
    outbox: Vec<ControlMessage>,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        control_tx: ControlSender,
        scope_rx: Consumer<ScopeFrame>,
        preview: PreviewBoard,
        frame: PortFrame,
        settings: EngineSettings,
        sample_rate: f32,
    ) -> Self {
        Self {
            control_tx,
            scope_rx,
            preview,
            panel: ControlPanel::new(&frame, settings),
            history: VecDeque::with_capacity(SPECTRUM_SIZE),
            spectrum: SpectrumAnalyzer::new(SPECTRUM_SIZE, sample_rate),
            sample_rate,
            outbox: Vec::new(),
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.panel.tick(&mut self.outbox);
            self.flush();
            self.poll_scope();

            terminal
                .draw(|frame| self.render(frame))
                .wrap_err("failed to draw frame")?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.should_quit = self.panel.handle_key(key.code, &mut self.outbox);
                    }
                }
            }
        }

        Ok(())
    }

    fn flush(&mut self) {
        for msg in self.outbox.drain(..) {
            debug!(?msg, "sending control");
            if !self.control_tx.send(msg) {
                warn!(?msg, "control dropped");
            }
        }
    }

    fn poll_scope(&mut self) {
        let mut received = false;
        while let Ok(frame) = self.scope_rx.pop() {
            if self.history.len() == self.spectrum.size() {
                self.history.pop_front();
            }
            self.history.push_back(frame);
            received = true;
        }
        if received {
            let ch1: Vec<f32> = self.history.iter().map(|f| f.unity1).collect();
            self.spectrum.update(&ch1);
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Min(8),    // Previews
                Constraint::Length(12), // Scope and spectrum
                Constraint::Length(1), // Help bar
            ])
            .split(area);

        let visible: Vec<ScopeFrame> = self
            .history
            .iter()
            .skip(self.history.len().saturating_sub(SCOPE_WINDOW))
            .copied()
            .collect();
        let stats = OutputStats::from_frames(&visible);
        render_status(frame, rows[0], &self.panel, &stats, self.sample_rate);

        let previews = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        for (id, area) in OuterChannelId::ALL.into_iter().zip(previews.iter()) {
            let snapshot = self.preview.snapshot(id);
            render_preview(frame, *area, id, &snapshot, id == self.panel.channel);
        }

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[2]);
        render_scope(frame, bottom[0], &visible);
        render_spectrum(frame, bottom[1], self.spectrum.data());

        let help = Paragraph::new(
            " [Q] Quit  [Tab] Channel  [Up/Down] Knob  [Left/Right/PgUp/PgDn] Turn  [C] Cycle  [T] Trigger  [G/S] Band-limit  [M] Mix  [I/D] Timing  [X] Reset",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, rows[3]);
    }
}
