use crate::time::DurationExt;
use std::time::Duration;
use tokio::time::Instant;

/// Current playback state from the media player
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// Whether music is currently playing
    pub is_playing: bool,
    /// Current track information (None if nothing is loaded)
    pub track: Option<TrackInfo>,
    /// Playback position at `updated_at`
    pub position: Duration,
    /// Total track duration, zero when unknown
    pub duration: Duration,
    /// When this state was sampled (for interpolation)
    pub updated_at: Instant,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            track: None,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            updated_at: Instant::now(),
        }
    }
}

impl PlaybackState {
    /// Create a new playback state sampled now
    #[must_use]
    pub fn new(
        is_playing: bool,
        track: Option<TrackInfo>,
        position: Duration,
        duration: Duration,
    ) -> Self {
        Self {
            is_playing,
            track,
            position,
            duration,
            updated_at: Instant::now(),
        }
    }

    /// Get interpolated position based on time elapsed since last update
    #[must_use]
    pub fn interpolated_position(&self) -> Duration {
        if !self.is_playing {
            return self.position;
        }

        let interpolated = self.position + self.updated_at.elapsed();

        if self.duration.is_zero() {
            interpolated
        } else {
            interpolated.min(self.duration)
        }
    }

    /// Interpolated position in lyrics timeline units
    #[must_use]
    pub fn position_ms(&self) -> i64 {
        self.interpolated_position().as_millis_i64()
    }

    /// Check if the track has changed
    #[must_use]
    pub fn track_changed(&self, other: &Self) -> bool {
        match (&self.track, &other.track) {
            (Some(a), Some(b)) => a.id != b.id,
            (None, None) => false,
            _ => true,
        }
    }

    /// Check if playback state changed (playing <-> paused)
    #[must_use]
    pub const fn playback_state_changed(&self, other: &Self) -> bool {
        self.is_playing != other.is_playing
    }

    /// Check if a seek occurred (position jumped unexpectedly).
    ///
    /// Both states are projected to now, so a sample that is simply older
    /// than `other` is not mistaken for a jump.
    #[must_use]
    pub fn seek_occurred(&self, other: &Self, threshold: Duration) -> bool {
        if self.track_changed(other) {
            return false;
        }

        let expected = self.interpolated_position();
        let actual = other.interpolated_position();

        if actual > expected {
            actual - expected > threshold
        } else {
            expected - actual > threshold
        }
    }
}

/// Information about the current track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Track identifier, the key for cached and stored lyrics
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration: Option<Duration>,
}

impl TrackInfo {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration: None,
        }
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Get duration in seconds (for lyrics query).
    ///
    /// Saturates at `u32::MAX`, which is more than sufficient for any track.
    #[must_use]
    pub fn duration_secs(&self) -> Option<u32> {
        self.duration.map(|d| d.as_secs_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> TrackInfo {
        TrackInfo::new(id, "Song", "Artist").with_duration(Duration::from_secs(180))
    }

    #[test]
    fn test_playback_state_default() {
        let state = PlaybackState::default();
        assert!(!state.is_playing);
        assert!(state.track.is_none());
        assert_eq!(state.position, Duration::ZERO);
        assert_eq!(state.duration, Duration::ZERO);
    }

    #[test]
    fn test_interpolated_position_paused() {
        let state = PlaybackState {
            is_playing: false,
            track: None,
            position: Duration::from_secs(30),
            duration: Duration::from_secs(180),
            updated_at: Instant::now() - Duration::from_secs(5),
        };

        assert_eq!(state.interpolated_position(), Duration::from_secs(30));
        assert_eq!(state.position_ms(), 30_000);
    }

    #[test]
    fn test_interpolated_position_advances() {
        let state = PlaybackState {
            is_playing: true,
            track: None,
            position: Duration::from_secs(30),
            duration: Duration::from_secs(180),
            updated_at: Instant::now() - Duration::from_secs(5),
        };

        assert!(state.interpolated_position() >= Duration::from_secs(35));
    }

    #[test]
    fn test_interpolated_position_clamped() {
        let state = PlaybackState {
            is_playing: true,
            track: None,
            position: Duration::from_secs(178),
            duration: Duration::from_secs(180),
            updated_at: Instant::now() - Duration::from_secs(10),
        };

        assert_eq!(state.interpolated_position(), Duration::from_secs(180));
    }

    #[test]
    fn test_interpolated_position_unknown_duration_not_clamped() {
        let state = PlaybackState {
            is_playing: true,
            track: None,
            position: Duration::from_secs(10),
            duration: Duration::ZERO,
            updated_at: Instant::now() - Duration::from_secs(10),
        };

        assert!(state.interpolated_position() >= Duration::from_secs(20));
    }

    #[test]
    fn test_track_changed() {
        let a = PlaybackState::new(true, Some(track("a")), Duration::ZERO, Duration::ZERO);
        let a_later = PlaybackState::new(true, Some(track("a")), Duration::from_secs(30), Duration::ZERO);
        let b = PlaybackState::new(true, Some(track("b")), Duration::ZERO, Duration::ZERO);
        let none = PlaybackState::default();

        assert!(!a.track_changed(&a_later));
        assert!(a.track_changed(&b));
        assert!(none.track_changed(&a));
        assert!(a.track_changed(&none));
        assert!(!none.track_changed(&PlaybackState::default()));
    }

    #[test]
    fn test_playback_state_changed() {
        let playing = PlaybackState {
            is_playing: true,
            ..Default::default()
        };
        let paused = PlaybackState::default();

        assert!(playing.playback_state_changed(&paused));
        assert!(!playing.playback_state_changed(&playing));
    }

    #[test]
    fn test_seek_occurred() {
        let before = PlaybackState::new(false, Some(track("a")), Duration::from_secs(10), Duration::ZERO);
        let small = PlaybackState::new(false, Some(track("a")), Duration::from_secs(11), Duration::ZERO);
        let jump = PlaybackState::new(false, Some(track("a")), Duration::from_secs(90), Duration::ZERO);
        let back = PlaybackState::new(false, Some(track("a")), Duration::from_secs(2), Duration::ZERO);
        let other = PlaybackState::new(false, Some(track("b")), Duration::from_secs(90), Duration::ZERO);

        let threshold = Duration::from_secs(2);
        assert!(!before.seek_occurred(&small, threshold));
        assert!(before.seek_occurred(&jump, threshold));
        assert!(before.seek_occurred(&back, threshold));
        assert!(!before.seek_occurred(&other, threshold));
    }

    #[test]
    fn test_track_info_builders() {
        let info = TrackInfo::new("id", "Song", "Artist")
            .with_album("Album")
            .with_duration(Duration::from_secs(183));

        assert_eq!(info.id, "id");
        assert_eq!(info.album.as_deref(), Some("Album"));
        assert_eq!(info.duration_secs(), Some(183));
        assert_eq!(TrackInfo::new("id", "s", "a").duration_secs(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_sample_is_not_a_seek() {
        let sample = PlaybackState::new(true, Some(track("a")), Duration::from_secs(10), Duration::ZERO);
        tokio::time::advance(Duration::from_secs(5)).await;

        // A player that has not reported anything new returns the same sample
        assert!(!sample.seek_occurred(&sample.clone(), Duration::from_secs(2)));

        let fresh = PlaybackState::new(true, Some(track("a")), Duration::from_secs(15), Duration::ZERO);
        assert!(!sample.seek_occurred(&fresh, Duration::from_secs(2)));

        let jumped = PlaybackState::new(true, Some(track("a")), Duration::from_secs(60), Duration::ZERO);
        assert!(sample.seek_occurred(&jumped, Duration::from_secs(2)));
    }
}
