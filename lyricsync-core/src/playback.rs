use crate::time::DurationExt;
use serde::Serialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One poll of the player's position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackSample {
    /// Natural playback position
    pub live_position_ms: u64,
    /// Set while the user scrubs; overrides the live position for resolution
    pub preview_position_ms: Option<u64>,
}

impl PlaybackSample {
    #[must_use]
    pub const fn live(live_position_ms: u64) -> Self {
        Self {
            live_position_ms,
            preview_position_ms: None,
        }
    }

    #[must_use]
    pub const fn with_preview(mut self, preview_position_ms: u64) -> Self {
        self.preview_position_ms = Some(preview_position_ms);
        self
    }
}

/// Audio player collaborator: pull-based position plus a seek command.
///
/// The player does not push position changes, so the engine samples it on a
/// fixed cadence.
pub trait PlaybackControl: Send + Sync {
    /// Current position, with the scrub override when one is active.
    fn sample(&self) -> PlaybackSample;

    /// Seek the player to `position_ms`.
    fn seek_to(&self, position_ms: u64);
}

#[derive(Debug, Clone)]
struct ClockState {
    is_playing: bool,
    /// Position at `updated_at`
    position: Duration,
    duration: Duration,
    updated_at: Instant,
    preview: Option<Duration>,
}

impl ClockState {
    fn interpolated_position(&self) -> Duration {
        if !self.is_playing {
            return self.position;
        }

        let interpolated = self.position + self.updated_at.elapsed();

        // Clamp to track duration
        interpolated.min(self.duration)
    }
}

/// Interpolating playback clock implementing [`PlaybackControl`].
///
/// Stores an anchor position and the instant it was taken, and advances it
/// with wall time while playing. Used by front ends without a real player
/// and in tests.
#[derive(Debug)]
pub struct PlaybackClock {
    state: Mutex<ClockState>,
}

impl PlaybackClock {
    /// Create a paused clock at `position` for a track of `duration`.
    #[must_use]
    pub fn new(position: Duration, duration: Duration) -> Self {
        Self {
            state: Mutex::new(ClockState {
                is_playing: false,
                position: position.min(duration),
                duration,
                updated_at: Instant::now(),
                preview: None,
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ClockState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn play(&self) {
        self.with_state(|state| {
            if !state.is_playing {
                state.updated_at = Instant::now();
                state.is_playing = true;
            }
        });
    }

    pub fn pause(&self) {
        self.with_state(|state| {
            state.position = state.interpolated_position();
            state.updated_at = Instant::now();
            state.is_playing = false;
        });
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.with_state(|state| state.is_playing)
    }

    /// Start or move a scrub preview.
    pub fn set_preview(&self, position: Duration) {
        self.with_state(|state| state.preview = Some(position.min(state.duration)));
    }

    /// Release the scrub without seeking.
    pub fn clear_preview(&self) {
        self.with_state(|state| state.preview = None);
    }

    #[must_use]
    pub fn position(&self) -> Duration {
        self.with_state(|state| state.interpolated_position())
    }

    /// True once a playing clock has reached the end of the track.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.with_state(|state| state.interpolated_position() >= state.duration)
    }
}

impl PlaybackControl for PlaybackClock {
    fn sample(&self) -> PlaybackSample {
        self.with_state(|state| PlaybackSample {
            live_position_ms: state.interpolated_position().as_millis_u64(),
            preview_position_ms: state.preview.map(|p| p.as_millis_u64()),
        })
    }

    fn seek_to(&self, position_ms: u64) {
        self.with_state(|state| {
            state.position = Duration::from_millis(position_ms).min(state.duration);
            state.updated_at = Instant::now();
        });
    }
}
