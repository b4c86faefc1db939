//! Loads lyrics whenever the sync engine reports a new track.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::playback::TrackInfo;
use crate::repository::LyricsRepository;
use crate::sync::{SyncEngine, SyncEvent};

/// Lyrics fetcher that listens for track changes and publishes lyrics
pub struct LyricsFetcher {
    sync_engine: Arc<SyncEngine>,
    repository: Arc<LyricsRepository>,
    cancel_token: CancellationToken,
}

impl LyricsFetcher {
    /// Create a new lyrics fetcher
    ///
    /// # Arguments
    /// * `sync_engine` - Sync engine to listen for track changes
    /// * `repository` - Source of lyrics for each track
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    pub fn new(
        sync_engine: Arc<SyncEngine>,
        repository: Arc<LyricsRepository>,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            sync_engine,
            repository,
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start the lyrics fetcher in a background task
    #[must_use]
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the lyrics fetching loop
    async fn run(&self) {
        info!("Initializing lyrics fetching handler");

        let mut rx = self.sync_engine.subscribe();
        let mut notices = self.repository.subscribe_notices();

        // A track may already be loaded before we subscribed
        if let Some(track) = self.sync_engine.current_track().await {
            info!(
                "Found existing track on startup: {} - {}, fetching lyrics",
                track.artist, track.title
            );
            self.load_lyrics_for_track(&track).await;
        }

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Lyrics fetcher shutting down");
                    break;
                }
                notice = notices.recv() => {
                    if let Ok(notice) = notice {
                        self.sync_engine.emit_notice(notice.to_string());
                    }
                }
                event = rx.recv() => {
                    match event {
                        Ok(SyncEvent::TrackChanged { track, .. } |
                           SyncEvent::PlaybackStarted { track, .. }) => {
                            self.load_lyrics_for_track(&track).await;
                        }
                        Err(RecvError::Closed) => {
                            break;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            debug!("Lyrics fetcher lagged by {} events", skipped);
                        }
                        Ok(_) => {}
                    }
                }
            }
        }
    }

    /// Load lyrics for a track and publish them if it is still current
    async fn load_lyrics_for_track(&self, track: &TrackInfo) {
        self.sync_engine.set_loading(&track.id).await;

        let entity = self.repository.get(track).await;

        let still_current = self
            .sync_engine
            .current_track()
            .await
            .is_some_and(|current| current.id == track.id);
        if !still_current {
            warn!("Track changed while loading lyrics for {}, discarding", track.id);
            return;
        }

        match entity.parse() {
            Some(lyrics) => {
                info!(
                    "Loaded {} lyrics for {} ({} lines)",
                    if lyrics.synced { "synced" } else { "unsynced" },
                    track.id,
                    lyrics.len()
                );
                self.sync_engine.set_lyrics(lyrics).await;
            }
            None => {
                info!("No lyrics for {}", track.id);
                self.sync_engine.set_no_lyrics().await;
            }
        }
    }
}
