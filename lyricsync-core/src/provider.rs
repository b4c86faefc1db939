use crate::error::CoreError;
use crate::playback::TrackInfo;
use async_trait::async_trait;

/// Query parameters for fetching lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    /// Track name
    pub track_name: String,
    /// Artist name
    pub artist_name: String,
    /// Album name (optional)
    pub album_name: Option<String>,
    /// Track duration in seconds (for matching)
    pub duration_secs: Option<u32>,
}

impl LyricsQuery {
    /// Create a new lyrics query
    pub fn new(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            album_name: None,
            duration_secs: None,
        }
    }

    /// Set album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album_name = Some(album.into());
        self
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    /// Build a query from the metadata of a track
    #[must_use]
    pub fn for_track(track: &TrackInfo) -> Self {
        let mut query = Self::new(&track.title, &track.artist);
        if let Some(ref album) = track.album {
            query = query.with_album(album);
        }
        if let Some(duration) = track.duration_secs() {
            query = query.with_duration(duration);
        }
        query
    }
}

/// Raw lyrics returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsResult {
    /// LRC text with timestamps
    Synced(String),
    /// Plain text lyrics without timing
    Unsynced(String),
    /// No lyrics found
    NotFound,
}

impl LyricsResult {
    /// Check if lyrics are synced
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }

    /// Consume into the raw text, if any
    #[must_use]
    pub fn into_raw(self) -> Option<String> {
        match self {
            Self::Synced(raw) | Self::Unsynced(raw) => Some(raw),
            Self::NotFound => None,
        }
    }
}

/// Lyrics with provider metadata
#[derive(Debug, Clone)]
pub struct FetchedLyrics {
    /// The lyrics result
    pub result: LyricsResult,
    /// Provider-specific ID (e.g., LRCLIB's numeric ID as string)
    pub provider_id: String,
}

/// Trait for remote lyrics providers
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Fetch lyrics for a query
    async fn fetch(&self, query: &LyricsQuery) -> Result<FetchedLyrics, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_query_for_track() {
        let track = TrackInfo::new("id-1", "Song", "Artist")
            .with_album("Album")
            .with_duration(Duration::from_secs(183));

        let query = LyricsQuery::for_track(&track);
        assert_eq!(query.track_name, "Song");
        assert_eq!(query.artist_name, "Artist");
        assert_eq!(query.album_name.as_deref(), Some("Album"));
        assert_eq!(query.duration_secs, Some(183));
    }

    #[test]
    fn test_query_for_track_without_optional_fields() {
        let query = LyricsQuery::for_track(&TrackInfo::new("id-2", "Song", "Artist"));
        assert!(query.album_name.is_none());
        assert!(query.duration_secs.is_none());
    }

    #[test]
    fn test_lyrics_result_helpers() {
        let synced = LyricsResult::Synced("[00:01.00]a".to_string());
        assert!(synced.is_synced());
        assert_eq!(synced.into_raw().as_deref(), Some("[00:01.00]a"));

        let plain = LyricsResult::Unsynced("a".to_string());
        assert!(!plain.is_synced());
        assert_eq!(plain.into_raw().as_deref(), Some("a"));

        assert!(LyricsResult::NotFound.into_raw().is_none());
    }
}
