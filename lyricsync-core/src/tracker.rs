//! Live / preview state machine driven by the polled playback samples.

use crate::playback::PlaybackSample;
use serde::Serialize;

/// Whether resolution follows the live position or a user preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    #[default]
    Live,
    /// The user is scrubbing; the preview position drives resolution
    Previewing,
    /// Scrub released; the last previewed position is held until the cooldown ends
    PreviewCooldown,
}

/// Outcome of one observed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerTick {
    pub state: TrackerState,
    /// Position the resolver should use this tick
    pub position_ms: u64,
    /// This tick moved out of `Previewing`
    pub left_preview: bool,
    /// This tick ended a cooldown and returned to the live position
    pub resumed_live: bool,
}

#[derive(Debug, Clone)]
pub struct PreviewTracker {
    state: TrackerState,
    cooldown_ms: u64,
    last_preview_ms: u64,
    cooldown_until_ms: u64,
}

impl PreviewTracker {
    #[must_use]
    pub const fn new(cooldown_ms: u64) -> Self {
        Self {
            state: TrackerState::Live,
            cooldown_ms,
            last_preview_ms: 0,
            cooldown_until_ms: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> TrackerState {
        self.state
    }

    /// Feed one sample taken at `now_ms` (any monotonic millisecond clock).
    pub fn observe(&mut self, sample: PlaybackSample, now_ms: u64) -> TrackerTick {
        let before = self.state;

        match sample.preview_position_ms {
            Some(preview_ms) => {
                self.state = TrackerState::Previewing;
                self.last_preview_ms = preview_ms;
            }
            None => match self.state {
                TrackerState::Previewing => {
                    self.state = TrackerState::PreviewCooldown;
                    self.cooldown_until_ms = now_ms.saturating_add(self.cooldown_ms);
                }
                TrackerState::PreviewCooldown if now_ms >= self.cooldown_until_ms => {
                    self.state = TrackerState::Live;
                }
                _ => {}
            },
        }

        let position_ms = match self.state {
            TrackerState::Live => sample.live_position_ms,
            TrackerState::Previewing | TrackerState::PreviewCooldown => self.last_preview_ms,
        };

        TrackerTick {
            state: self.state,
            position_ms,
            left_preview: before == TrackerState::Previewing
                && self.state != TrackerState::Previewing,
            resumed_live: before == TrackerState::PreviewCooldown
                && self.state == TrackerState::Live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: u64 = 2_000;

    fn live(position_ms: u64) -> PlaybackSample {
        PlaybackSample::live(position_ms)
    }

    fn preview(live_ms: u64, preview_ms: u64) -> PlaybackSample {
        PlaybackSample::live(live_ms).with_preview(preview_ms)
    }

    #[test]
    fn test_live_uses_live_position() {
        let mut tracker = PreviewTracker::new(COOLDOWN);
        let tick = tracker.observe(live(1_234), 0);
        assert_eq!(tick.state, TrackerState::Live);
        assert_eq!(tick.position_ms, 1_234);
        assert!(!tick.left_preview);
    }

    #[test]
    fn test_preview_overrides_live() {
        let mut tracker = PreviewTracker::new(COOLDOWN);
        let tick = tracker.observe(preview(1_000, 50_000), 0);
        assert_eq!(tick.state, TrackerState::Previewing);
        assert_eq!(tick.position_ms, 50_000);
    }

    #[test]
    fn test_release_holds_preview_during_cooldown() {
        let mut tracker = PreviewTracker::new(COOLDOWN);
        tracker.observe(preview(1_000, 50_000), 0);

        let released = tracker.observe(live(1_050), 50);
        assert_eq!(released.state, TrackerState::PreviewCooldown);
        assert_eq!(released.position_ms, 50_000);
        assert!(released.left_preview);

        let holding = tracker.observe(live(3_000), 2_049);
        assert_eq!(holding.state, TrackerState::PreviewCooldown);
        assert_eq!(holding.position_ms, 50_000);
        assert!(!holding.left_preview);

        let back = tracker.observe(live(3_050), 2_050);
        assert_eq!(back.state, TrackerState::Live);
        assert_eq!(back.position_ms, 3_050);
        assert!(back.resumed_live);
    }

    #[test]
    fn test_scrub_resumes_during_cooldown() {
        let mut tracker = PreviewTracker::new(COOLDOWN);
        tracker.observe(preview(0, 10_000), 0);
        tracker.observe(live(50), 50);

        let resumed = tracker.observe(preview(100, 20_000), 500);
        assert_eq!(resumed.state, TrackerState::Previewing);
        assert_eq!(resumed.position_ms, 20_000);
        assert!(!resumed.resumed_live);

        // A fresh cooldown starts from the second release
        tracker.observe(live(600), 600);
        assert_eq!(
            tracker.observe(live(2_500), 2_500).state,
            TrackerState::PreviewCooldown
        );
        assert_eq!(tracker.observe(live(2_600), 2_600).state, TrackerState::Live);
    }

    #[test]
    fn test_zero_cooldown_returns_next_tick() {
        let mut tracker = PreviewTracker::new(0);
        tracker.observe(preview(0, 10_000), 0);
        assert_eq!(tracker.observe(live(50), 50).state, TrackerState::PreviewCooldown);
        assert_eq!(tracker.observe(live(100), 100).state, TrackerState::Live);
    }
}
