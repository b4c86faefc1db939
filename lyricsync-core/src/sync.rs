use crate::config::{Config, TextAlignment};
use crate::lrc::{LyricsEntry, ParsedLyrics};
use crate::playback::{PlaybackState, TrackInfo};
use crate::source::PositionSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Position jumps larger than this count as a seek
const SEEK_THRESHOLD: Duration = Duration::from_secs(2);

/// Events emitted by the sync engine
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Playback started for a track
    PlaybackStarted {
        track: TrackInfo,
        position: Duration,
    },
    /// Playback was paused
    PlaybackPaused { position: Duration },
    /// Playback was resumed
    PlaybackResumed { position: Duration },
    /// Playback stopped (no track loaded)
    PlaybackStopped,
    /// Track changed to a new track
    TrackChanged {
        track: TrackInfo,
        position: Duration,
    },
    /// A seek occurred within the current track
    SeekOccurred { position: Duration },
    /// A lyrics lookup started for a track
    LyricsLoading { track_id: String },
    /// Lyrics were loaded for current track
    LyricsLoaded { lyrics: ParsedLyrics },
    /// No lyrics found for current track
    LyricsNotFound,
    /// The active line changed
    LineChanged {
        index: Option<usize>,
        position: Duration,
    },
    /// Message for the user, e.g. a failed save
    Notice { message: String },
}

/// Lyrics availability for the current track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LyricsState {
    /// Nothing requested yet
    #[default]
    Idle,
    Loading,
    NotFound,
    Loaded(ParsedLyrics),
}

impl LyricsState {
    #[must_use]
    pub const fn lyrics(&self) -> Option<&ParsedLyrics> {
        match self {
            Self::Loaded(lyrics) => Some(lyrics),
            _ => None,
        }
    }
}

/// Change detector for the active line index
#[derive(Debug, Default)]
pub struct LineTracker {
    current: Option<usize>,
    primed: bool,
}

impl LineTracker {
    /// Record `index`. Returns true when it differs from the last one, or on
    /// the first observation after a reset.
    pub fn observe(&mut self, index: Option<usize>) -> bool {
        let changed = !self.primed || self.current != index;
        self.current = index;
        self.primed = true;
        changed
    }

    #[must_use]
    pub const fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Behavior switches for the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Prepend the head entry to synced lyrics
    pub head_entry: bool,
    /// Allow jumping to a line by selecting it
    pub click_to_seek: bool,
    /// How front-ends lay out each line
    pub text_alignment: TextAlignment,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            head_entry: true,
            click_to_seek: true,
            text_alignment: TextAlignment::default(),
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            head_entry: config.lyrics.head_entry,
            click_to_seek: config.preferences.click_to_seek,
            text_alignment: config.preferences.text_alignment,
        }
    }
}

/// Sync engine state
#[derive(Default)]
struct SyncEngineInner {
    state: PlaybackState,
    lyrics: LyricsState,
    tracker: LineTracker,
}

/// Engine that synchronizes playback state and lyrics
pub struct SyncEngine {
    inner: RwLock<SyncEngineInner>,
    event_tx: broadcast::Sender<SyncEvent>,
    options: SyncOptions,
}

impl SyncEngine {
    /// Create a new sync engine
    #[must_use]
    pub fn new(options: SyncOptions) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);

        Arc::new(Self {
            inner: RwLock::new(SyncEngineInner::default()),
            event_tx,
            options,
        })
    }

    /// Subscribe to sync events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub const fn options(&self) -> SyncOptions {
        self.options
    }

    /// Spawn the polling loop on the current runtime
    #[must_use]
    pub fn start_polling(
        self: &Arc<Self>,
        source: Arc<dyn PositionSource>,
        poll_interval: Duration,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_polling(source, poll_interval, cancel_token).await;
        })
    }

    /// Sample `source` every `poll_interval` until cancelled
    pub async fn run_polling(
        &self,
        source: Arc<dyn PositionSource>,
        poll_interval: Duration,
        cancel_token: CancellationToken,
    ) {
        info!(
            "Polling {} every {}ms",
            source.name(),
            poll_interval.as_millis()
        );

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Sync polling stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.update_state(source.snapshot()).await;
                }
            }
        }
    }

    /// Update playback state, emit appropriate events and re-evaluate the
    /// active line
    pub async fn update_state(&self, new_state: PlaybackState) {
        let mut inner = self.inner.write().await;
        let old_state = &inner.state;

        let track_changed = old_state.track_changed(&new_state);
        let playback_changed = old_state.playback_state_changed(&new_state);
        let seek_occurred = old_state.seek_occurred(&new_state, SEEK_THRESHOLD);

        if track_changed {
            inner.lyrics = LyricsState::Idle;
            inner.tracker.reset();

            if let Some(ref track) = new_state.track {
                let _ = self.event_tx.send(SyncEvent::TrackChanged {
                    track: track.clone(),
                    position: new_state.position,
                });
                // Also emit play state so listeners know if track is playing or paused
                if new_state.is_playing {
                    let _ = self.event_tx.send(SyncEvent::PlaybackResumed {
                        position: new_state.position,
                    });
                } else {
                    let _ = self.event_tx.send(SyncEvent::PlaybackPaused {
                        position: new_state.position,
                    });
                }
            } else {
                let _ = self.event_tx.send(SyncEvent::PlaybackStopped);
            }
        } else if playback_changed {
            if new_state.is_playing {
                if old_state.track.is_some() {
                    let _ = self.event_tx.send(SyncEvent::PlaybackResumed {
                        position: new_state.position,
                    });
                } else if let Some(ref track) = new_state.track {
                    let _ = self.event_tx.send(SyncEvent::PlaybackStarted {
                        track: track.clone(),
                        position: new_state.position,
                    });
                }
            } else {
                let _ = self.event_tx.send(SyncEvent::PlaybackPaused {
                    position: new_state.position,
                });
            }
        } else if seek_occurred {
            debug!("Seek to {:?}", new_state.position);
            let _ = self.event_tx.send(SyncEvent::SeekOccurred {
                position: new_state.position,
            });
        }

        inner.state = new_state;
        self.evaluate_line(&mut inner);
    }

    /// Mark that lyrics are being fetched for a track
    pub async fn set_loading(&self, track_id: &str) {
        let mut inner = self.inner.write().await;
        inner.lyrics = LyricsState::Loading;
        inner.tracker.reset();
        let _ = self.event_tx.send(SyncEvent::LyricsLoading {
            track_id: track_id.to_string(),
        });
    }

    /// Set lyrics for the current track
    pub async fn set_lyrics(&self, lyrics: ParsedLyrics) {
        let lyrics = if self.options.head_entry {
            lyrics.with_head_entry()
        } else {
            lyrics
        };

        let mut inner = self.inner.write().await;
        inner.lyrics = LyricsState::Loaded(lyrics.clone());
        inner.tracker.reset();
        let _ = self.event_tx.send(SyncEvent::LyricsLoaded { lyrics });
        self.evaluate_line(&mut inner);
    }

    /// Mark that no lyrics were found
    pub async fn set_no_lyrics(&self) {
        let mut inner = self.inner.write().await;
        inner.lyrics = LyricsState::NotFound;
        inner.tracker.reset();
        let _ = self.event_tx.send(SyncEvent::LyricsNotFound);
    }

    /// Emit a user-facing notice
    pub fn emit_notice(&self, message: String) {
        let _ = self.event_tx.send(SyncEvent::Notice { message });
    }

    /// Position to seek to when the user selects the line at `index`.
    ///
    /// `None` when click-to-seek is disabled or the line has no usable time.
    pub async fn seek_target(&self, index: usize) -> Option<Duration> {
        if !self.options.click_to_seek {
            return None;
        }
        self.inner.read().await.lyrics.lyrics()?.seek_target(index)
    }

    /// Index of the active line as of the last evaluation
    pub async fn current_line_index(&self) -> Option<usize> {
        self.inner.read().await.tracker.current()
    }

    /// Get current lyrics state
    pub async fn lyrics_state(&self) -> LyricsState {
        self.inner.read().await.lyrics.clone()
    }

    /// Ordered entries of the loaded lyrics, empty otherwise
    pub async fn entries(&self) -> Vec<LyricsEntry> {
        self.inner
            .read()
            .await
            .lyrics
            .lyrics()
            .map(|lyrics| lyrics.entries.clone())
            .unwrap_or_default()
    }

    /// Get current playback state
    pub async fn state(&self) -> PlaybackState {
        self.inner.read().await.state.clone()
    }

    /// Get current track info
    pub async fn current_track(&self) -> Option<TrackInfo> {
        self.inner.read().await.state.track.clone()
    }

    fn evaluate_line(&self, inner: &mut SyncEngineInner) {
        let Some(lyrics) = inner.lyrics.lyrics() else {
            return;
        };

        let position = inner.state.interpolated_position();
        let index = lyrics.current_line_index(inner.state.position_ms());

        if inner.tracker.observe(index) {
            debug!("Active line {:?} at {:?}", index, position);
            let _ = self.event_tx.send(SyncEvent::LineChanged { index, position });
        }
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(SyncEngineInner::default()),
            event_tx,
            options: SyncOptions::default(),
        }
    }
}
