pub mod config;
pub mod entity;
pub mod error;
pub mod fetcher;
pub mod lrc;
pub mod paths;
pub mod playback;
pub mod provider;
pub mod repository;
pub mod source;
pub mod store;
pub mod sync;
pub mod time;

pub use config::{Config, LyricsConfig, LyricsProviderType, PreferencesConfig, TextAlignment};
pub use entity::{LyricsContent, LyricsEntity, LYRICS_NOT_FOUND};
pub use error::{CoreError, Result};
pub use fetcher::LyricsFetcher;
pub use lrc::{locate, LrcMetadata, LyricsEntry, ParsedLyrics, HEAD_TIMESTAMP};
pub use paths::{config_dir, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LYRICS_STORE_DB_FILE_NAME};
pub use playback::{PlaybackState, TrackInfo};
pub use provider::{FetchedLyrics, LyricsProvider, LyricsQuery, LyricsResult};
pub use repository::{LyricsNotice, LyricsRepository};
pub use source::{PositionSource, SimulatedPlayer};
pub use store::{LyricsPersistence, LyricsStore};
pub use sync::{LineTracker, LyricsState, SyncEngine, SyncEvent, SyncOptions};
pub use time::DurationExt;
