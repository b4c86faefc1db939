//! Playback position sources polled by the sync engine.

use crate::playback::{PlaybackState, TrackInfo};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// A media player whose position the sync engine samples on every tick.
///
/// Implementations must be cheap to call: the engine polls at the configured
/// interval (50 ms by default) for as long as lyrics are on screen.
pub trait PositionSource: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &'static str;

    /// Current playback state. Its `updated_at` must reflect when `position`
    /// was observed so the engine can interpolate between samples.
    fn snapshot(&self) -> PlaybackState;
}

/// In-process player clock driven by explicit play/pause/seek calls.
///
/// Used by the CLI to follow a lyrics file without a real player, and by tests.
#[derive(Debug, Default)]
pub struct SimulatedPlayer {
    state: RwLock<PlaybackState>,
}

impl SimulatedPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a track and start playing from `position`
    pub fn play(&self, track: TrackInfo, position: Duration) {
        let duration = track.duration.unwrap_or_default();
        self.replace(PlaybackState::new(true, Some(track), position, duration));
    }

    /// Freeze the clock at the current position
    pub fn pause(&self) {
        let mut state = self.snapshot();
        state.position = state.interpolated_position();
        state.is_playing = false;
        state.updated_at = Instant::now();
        self.replace(state);
    }

    /// Continue from the paused position
    pub fn resume(&self) {
        let mut state = self.snapshot();
        if state.track.is_some() {
            state.is_playing = true;
            state.updated_at = Instant::now();
            self.replace(state);
        }
    }

    /// Jump to `position` in the current track
    pub fn seek(&self, position: Duration) {
        let mut state = self.snapshot();
        state.position = position;
        state.updated_at = Instant::now();
        self.replace(state);
    }

    /// Unload the current track
    pub fn stop(&self) {
        self.replace(PlaybackState::default());
    }

    /// Whether playback has reached the end of a track with known duration
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let state = self.snapshot();
        !state.duration.is_zero() && state.interpolated_position() >= state.duration
    }

    fn replace(&self, state: PlaybackState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl PositionSource for SimulatedPlayer {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn snapshot(&self) -> PlaybackState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
