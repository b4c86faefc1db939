//! Persisted association between a track and its lyrics.

use crate::lrc::ParsedLyrics;
use chrono::{DateTime, Utc};

/// Stored marker meaning "lookup performed, nothing found"
pub const LYRICS_NOT_FOUND: &str = "LYRICS_NOT_FOUND";

/// Lyrics content for a track, or the not-found marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsContent {
    Found(String),
    NotFound,
}

impl LyricsContent {
    /// Decode the stored column value
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        if value == LYRICS_NOT_FOUND {
            Self::NotFound
        } else {
            Self::Found(value)
        }
    }

    /// Encode for the stored column
    #[must_use]
    pub fn as_stored(&self) -> &str {
        match self {
            Self::Found(raw) => raw,
            Self::NotFound => LYRICS_NOT_FOUND,
        }
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Found(raw) => Some(raw),
            Self::NotFound => None,
        }
    }
}

/// Lyrics stored for one track id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsEntity {
    pub id: String,
    pub content: LyricsContent,
    pub fetched_at: DateTime<Utc>,
}

impl LyricsEntity {
    pub fn found(id: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: LyricsContent::Found(raw.into()),
            fetched_at: Utc::now(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: LyricsContent::NotFound,
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.content.is_found()
    }

    /// Parse the stored text into timed entries. `None` for the not-found marker.
    #[must_use]
    pub fn parse(&self) -> Option<ParsedLyrics> {
        self.content.raw().map(ParsedLyrics::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_round_trip() {
        let found = LyricsContent::Found("[00:01.00]hi".to_string());
        assert_eq!(LyricsContent::from_stored(found.as_stored().to_string()), found);
        assert_eq!(
            LyricsContent::from_stored(LYRICS_NOT_FOUND.to_string()),
            LyricsContent::NotFound
        );
        assert_eq!(LyricsContent::NotFound.as_stored(), LYRICS_NOT_FOUND);
    }

    #[test]
    fn test_entity_parse() {
        let entity = LyricsEntity::found("track-1", "[00:01.00]hi\n[00:02.00]there");
        assert!(entity.is_found());
        let parsed = entity.parse();
        assert_eq!(parsed.map(|p| p.len()), Some(2));

        let missing = LyricsEntity::not_found("track-2");
        assert!(!missing.is_found());
        assert!(missing.parse().is_none());
    }
}
