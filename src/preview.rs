//! Lock-free timing preview for a display thread.

/*
Preview Telemetry
=================

The UI draws each outer channel's rise/fall curve. It needs the stage times
and the signed shape, but it runs at its own frame rate on its own thread,
and the audio thread must never wait for it.

    audio thread                           UI thread
    ────────────                           ─────────
    PreviewPublisher::update (per sample)
        │  rate-limited, thresholded
        ▼
    PreviewSharedState  ◄── relaxed atomics ──  snapshot()

Vocabulary
----------

  interactive   A rise, fall or shape knob moved within the last 250 ms.
                While interactive the publisher runs at ~60 Hz, otherwise at
                ~30 Hz (CV-only movement).

  version       Incremented (wrapping) after every publish. A consumer that
                sees the same version as last frame can skip redrawing.


Torn Reads
----------

Each field is its own atomic and every access is `Relaxed`. A reader can
therefore observe a new rise time next to an old fall time. That is accepted:
the fields rarely change together, and the worst outcome is a preview that
is one frame stale. The version counter is a change hint, not a lock, and
must stay that way so the audio thread never blocks.
*/

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::outer::timing::{StageTimes, PARAM_CACHE_EPS};
use crate::outer::OuterChannelId;

/// How long a knob movement keeps the fast publish rate.
pub const INTERACTIVE_HOLD_S: f32 = 0.25;
pub const FAST_INTERVAL_S: f32 = 1.0 / 60.0;
pub const SLOW_INTERVAL_S: f32 = 1.0 / 30.0;

/// Stage-time changes below this (seconds) are not published.
pub const TIME_ABS_THRESHOLD: f32 = 1e-5;
/// Stage-time changes below this fraction are not published.
pub const TIME_REL_THRESHOLD: f32 = 0.005;
pub const SHAPE_THRESHOLD: f32 = 1e-3;

/// What a consumer gets back for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewSnapshot {
    pub rise_time: f32,
    pub fall_time: f32,
    pub shape_signed: f32,
    pub interactive: bool,
    pub version: u32,
}

/// Single-writer, multi-reader preview cell.
#[derive(Debug)]
pub struct PreviewSharedState {
    rise_bits: AtomicU32,
    fall_bits: AtomicU32,
    shape_bits: AtomicU32,
    interactive: AtomicBool,
    version: AtomicU32,
}

impl PreviewSharedState {
    pub fn new() -> Self {
        let times = StageTimes::default();
        Self {
            rise_bits: AtomicU32::new(times.rise.to_bits()),
            fall_bits: AtomicU32::new(times.fall.to_bits()),
            shape_bits: AtomicU32::new(0.0f32.to_bits()),
            interactive: AtomicBool::new(false),
            version: AtomicU32::new(0),
        }
    }

    fn store(&self, times: StageTimes, shape_signed: f32, interactive: bool) {
        self.rise_bits.store(times.rise.to_bits(), Ordering::Relaxed);
        self.fall_bits.store(times.fall.to_bits(), Ordering::Relaxed);
        self.shape_bits.store(shape_signed.to_bits(), Ordering::Relaxed);
        self.interactive.store(interactive, Ordering::Relaxed);
        self.version.fetch_add(1, Ordering::Relaxed);
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PreviewSnapshot {
        PreviewSnapshot {
            version: self.version.load(Ordering::Relaxed),
            rise_time: f32::from_bits(self.rise_bits.load(Ordering::Relaxed)),
            fall_time: f32::from_bits(self.fall_bits.load(Ordering::Relaxed)),
            shape_signed: f32::from_bits(self.shape_bits.load(Ordering::Relaxed)),
            interactive: self.interactive.load(Ordering::Relaxed),
        }
    }
}

impl Default for PreviewSharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable read side covering both outer channels.
#[derive(Debug, Clone)]
pub struct PreviewBoard {
    channels: [Arc<PreviewSharedState>; 2],
}

impl PreviewBoard {
    pub fn new() -> Self {
        Self {
            channels: [
                Arc::new(PreviewSharedState::new()),
                Arc::new(PreviewSharedState::new()),
            ],
        }
    }

    pub fn shared(&self, channel: OuterChannelId) -> &Arc<PreviewSharedState> {
        &self.channels[channel.index()]
    }

    pub fn snapshot(&self, channel: OuterChannelId) -> PreviewSnapshot {
        self.shared(channel).snapshot()
    }
}

impl Default for PreviewBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Knob positions that mark the preview as interactive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewKnobs {
    pub rise: f32,
    pub fall: f32,
    pub shape: f32,
}

impl PreviewKnobs {
    fn moved_from(&self, other: &PreviewKnobs) -> bool {
        (self.rise - other.rise).abs() > PARAM_CACHE_EPS
            || (self.fall - other.fall).abs() > PARAM_CACHE_EPS
            || (self.shape - other.shape).abs() > PARAM_CACHE_EPS
    }
}

#[derive(Debug, Clone, Copy)]
struct Published {
    times: StageTimes,
    shape_signed: f32,
    interactive: bool,
}

/// Audio-side writer: decides when a new preview is worth publishing.
#[derive(Debug)]
pub struct PreviewPublisher {
    shared: Arc<PreviewSharedState>,
    last_sent: Option<Published>,
    last_knobs: Option<PreviewKnobs>,
    interactive_left: f32,
    since_check: f32,
}

#[inline]
fn time_moved(new: f32, old: f32) -> bool {
    let threshold = TIME_ABS_THRESHOLD.max(TIME_REL_THRESHOLD * old.abs());
    (new - old).abs() > threshold
}

impl PreviewPublisher {
    pub fn new(shared: Arc<PreviewSharedState>) -> Self {
        Self {
            shared,
            last_sent: None,
            last_knobs: None,
            interactive_left: 0.0,
            since_check: 0.0,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive_left > 0.0
    }

    /// Feed `elapsed` seconds of state. Returns true when a new version was
    /// published.
    pub fn update(
        &mut self,
        elapsed: f32,
        knobs: PreviewKnobs,
        times: StageTimes,
        shape_signed: f32,
    ) -> bool {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };

        let knob_moved = self
            .last_knobs
            .is_some_and(|last| knobs.moved_from(&last));
        if knob_moved {
            self.interactive_left = INTERACTIVE_HOLD_S;
            self.last_knobs = Some(knobs);
        } else {
            if self.last_knobs.is_none() {
                self.last_knobs = Some(knobs);
            }
            self.interactive_left = (self.interactive_left - elapsed).max(0.0);
        }
        let interactive = self.is_interactive();

        self.since_check += elapsed;
        let interval = if interactive {
            FAST_INTERVAL_S
        } else {
            SLOW_INTERVAL_S
        };
        if self.last_sent.is_some() && self.since_check < interval {
            return false;
        }
        self.since_check = 0.0;

        let changed = match self.last_sent {
            None => true,
            Some(last) => {
                time_moved(times.rise, last.times.rise)
                    || time_moved(times.fall, last.times.fall)
                    || (shape_signed - last.shape_signed).abs() > SHAPE_THRESHOLD
                    || interactive != last.interactive
            }
        };
        if !changed {
            return false;
        }

        self.shared.store(times, shape_signed, interactive);
        self.last_sent = Some(Published {
            times,
            shape_signed,
            interactive,
        });
        true
    }

    /// Publish on the next update regardless of thresholds.
    pub fn force_next(&mut self) {
        self.last_sent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 48_000.0;

    fn knobs(rise: f32) -> PreviewKnobs {
        PreviewKnobs {
            rise,
            fall: 0.0,
            shape: 0.33,
        }
    }

    fn times(rise: f32) -> StageTimes {
        StageTimes { rise, fall: 0.01 }
    }

    #[test]
    fn first_update_publishes() {
        let shared = Arc::new(PreviewSharedState::new());
        let mut publisher = PreviewPublisher::new(shared.clone());
        assert!(publisher.update(DT, knobs(0.0), times(0.002), 0.0));
        let snap = shared.snapshot();
        assert_eq!(snap.version, 1);
        assert_eq!(snap.rise_time, 0.002);
    }

    #[test]
    fn version_wraps_instead_of_overflowing() {
        let shared = PreviewSharedState::new();
        shared.version.store(u32::MAX, Ordering::Relaxed);
        shared.store(times(0.002), 0.0, false);
        assert_eq!(shared.version(), 0);
        assert_eq!(shared.snapshot().rise_time, 0.002);
    }

    #[test]
    fn unchanged_state_keeps_version() {
        let shared = Arc::new(PreviewSharedState::new());
        let mut publisher = PreviewPublisher::new(shared.clone());
        for _ in 0..48_000 {
            publisher.update(DT, knobs(0.0), times(0.002), 0.0);
        }
        assert_eq!(shared.version(), 1);
    }

    #[test]
    fn cv_only_changes_publish_at_slow_rate() {
        let shared = Arc::new(PreviewSharedState::new());
        let mut publisher = PreviewPublisher::new(shared.clone());
        // One second of a sweeping time with the knobs still.
        for i in 0..48_000 {
            let t = 0.002 + i as f32 * 1e-6;
            publisher.update(DT, knobs(0.0), times(t), 0.0);
        }
        let published = shared.version();
        assert!((25..=32).contains(&published), "published {published}");
    }

    #[test]
    fn knob_movement_publishes_fast_then_decays() {
        let shared = Arc::new(PreviewSharedState::new());
        let mut publisher = PreviewPublisher::new(shared.clone());
        publisher.update(DT, knobs(0.0), times(0.002), 0.0);

        // 200 ms of knob turning.
        for i in 0..9_600 {
            let k = i as f32 / 9_600.0;
            publisher.update(DT, knobs(k), times(0.002 + k), 0.0);
        }
        let fast = shared.version() - 1;
        assert!((10..=14).contains(&fast), "published {fast}");
        assert!(shared.snapshot().interactive);

        // Let the hold expire with everything still.
        for _ in 0..24_000 {
            publisher.update(DT, knobs(1.0), times(1.002), 0.0);
        }
        assert!(!publisher.is_interactive());
        assert!(!shared.snapshot().interactive);
    }

    #[test]
    fn relative_threshold_ignores_noise_on_long_times() {
        let shared = Arc::new(PreviewSharedState::new());
        let mut publisher = PreviewPublisher::new(shared.clone());
        publisher.update(DT, knobs(0.9), times(100.0), 0.0);
        for i in 0..48_000 {
            let jitter = if i % 2 == 0 { 0.1 } else { -0.1 };
            publisher.update(DT, knobs(0.9), times(100.0 + jitter), 0.0);
        }
        assert_eq!(shared.version(), 1);
    }

    #[test]
    fn reader_thread_never_sees_garbage() {
        let board = PreviewBoard::new();
        let reader_board = board.clone();
        let reader = std::thread::spawn(move || {
            let mut last_version = 0;
            for _ in 0..10_000 {
                let snap = reader_board.snapshot(OuterChannelId::Ch1);
                assert!(snap.rise_time.is_finite() && snap.rise_time > 0.0);
                assert!(snap.version >= last_version);
                last_version = snap.version;
            }
        });

        let mut publisher = PreviewPublisher::new(board.shared(OuterChannelId::Ch1).clone());
        for i in 0..100_000 {
            publisher.force_next();
            publisher.update(DT, knobs(0.0), times(0.001 + i as f32 * 1e-7), 0.0);
        }
        reader.join().unwrap();
        assert_eq!(board.snapshot(OuterChannelId::Ch1).version, 100_000);
        assert_eq!(board.snapshot(OuterChannelId::Ch4).version, 0);
    }
}
