//! Per-track lyrics lookup: memory cache, local store, then remote providers.

use crate::entity::LyricsEntity;
use crate::playback::TrackInfo;
use crate::provider::{LyricsProvider, LyricsQuery};
use crate::store::LyricsPersistence;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, OnceCell};
use tracing::{debug, error, info, warn};

/// Problems the user should be told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsNotice {
    /// Lyrics were fetched but could not be saved; the write is not retried
    PersistenceFailed { track_id: String, message: String },
}

impl fmt::Display for LyricsNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersistenceFailed { track_id, message } => {
                write!(f, "Failed to save lyrics for {track_id}: {message}")
            }
        }
    }
}

/// Default number of track ids kept in memory before finished lookups are evicted
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;

/// Resolves lyrics for tracks with at most one lookup in flight per track id.
///
/// Results, including "not found", stay in memory so a track is not fetched
/// twice in one session unless [`refetch`](Self::refetch) is called. Once the
/// map holds `memory_capacity` ids, completed entries are dropped; evicted
/// tracks are read back from the store.
pub struct LyricsRepository {
    store: Option<Arc<dyn LyricsPersistence>>,
    providers: Vec<Box<dyn LyricsProvider>>,
    memory: Mutex<HashMap<String, Arc<OnceCell<LyricsEntity>>>>,
    memory_capacity: usize,
    /// Held across check-then-write so a stale lookup cannot overwrite a replacement
    writes: Mutex<()>,
    notice_tx: broadcast::Sender<LyricsNotice>,
}

impl LyricsRepository {
    /// Create a repository.
    ///
    /// # Arguments
    /// * `store` - Local persistence, or `None` to keep results in memory only
    /// * `providers` - Remote providers to try in order
    #[must_use]
    pub fn new(
        store: Option<Arc<dyn LyricsPersistence>>,
        providers: Vec<Box<dyn LyricsProvider>>,
    ) -> Self {
        let (notice_tx, _) = broadcast::channel(16);
        Self {
            store,
            providers,
            memory: Mutex::new(HashMap::new()),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            writes: Mutex::new(()),
            notice_tx,
        }
    }

    /// Limit how many track ids are kept in memory
    #[must_use]
    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity.max(1);
        self
    }

    /// Subscribe to user-facing notices
    pub fn subscribe_notices(&self) -> broadcast::Receiver<LyricsNotice> {
        self.notice_tx.subscribe()
    }

    /// Names of the configured providers, in priority order
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Get lyrics for a track.
    ///
    /// Concurrent calls for the same track id share a single lookup.
    pub async fn get(&self, track: &TrackInfo) -> LyricsEntity {
        let cell = {
            let mut memory = self.memory.lock().await;
            if !memory.contains_key(&track.id) && memory.len() >= self.memory_capacity {
                let before = memory.len();
                // In-flight lookups stay so concurrent callers still share them
                memory.retain(|_, cell| !cell.initialized());
                debug!("Evicted {} lyrics from memory", before - memory.len());
            }
            Arc::clone(memory.entry(track.id.clone()).or_default())
        };

        cell.get_or_init(|| self.load(track, &cell)).await.clone()
    }

    /// The in-memory entity for a track id, without triggering a lookup
    pub async fn cached(&self, track_id: &str) -> Option<LyricsEntity> {
        let cell = self.memory.lock().await.get(track_id).cloned()?;
        cell.get().cloned()
    }

    /// Fetch lyrics from the providers again, bypassing memory and store,
    /// and replace whatever was kept for the track
    pub async fn refetch(&self, track: &TrackInfo) -> LyricsEntity {
        info!("Refetching lyrics for {}", track.id);
        let entity = self.fetch_remote(track).await;
        self.replace(entity).await
    }

    /// Replace a track's lyrics with user-supplied text
    pub async fn update(&self, track_id: &str, raw: impl Into<String>) -> LyricsEntity {
        self.replace(LyricsEntity::found(track_id, raw)).await
    }

    /// Drop the in-memory entry so the next `get` consults the store again
    pub async fn invalidate(&self, track_id: &str) {
        self.memory.lock().await.remove(track_id);
    }

    async fn replace(&self, entity: LyricsEntity) -> LyricsEntity {
        let _writes = self.writes.lock().await;
        {
            let mut memory = self.memory.lock().await;
            memory.insert(
                entity.id.clone(),
                Arc::new(OnceCell::new_with(Some(entity.clone()))),
            );
        }
        self.persist(&entity).await;
        entity
    }

    async fn load(&self, track: &TrackInfo, cell: &Arc<OnceCell<LyricsEntity>>) -> LyricsEntity {
        if let Some(store) = &self.store {
            match store.get(&track.id).await {
                Ok(Some(entity)) => {
                    info!(
                        "Using stored lyrics for {} (found: {})",
                        track.id,
                        entity.is_found()
                    );
                    return entity;
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read stored lyrics for {}: {}", track.id, e),
            }
        }

        let entity = self.fetch_remote(track).await;

        let _writes = self.writes.lock().await;
        if self.superseded(&track.id, cell).await {
            info!(
                "Lyrics for {} were replaced during lookup, not storing result",
                track.id
            );
        } else {
            self.persist(&entity).await;
        }
        entity
    }

    /// Whether `refetch` or `update` installed a different cell for `track_id`
    async fn superseded(&self, track_id: &str, cell: &Arc<OnceCell<LyricsEntity>>) -> bool {
        self.memory
            .lock()
            .await
            .get(track_id)
            .is_some_and(|current| !Arc::ptr_eq(current, cell))
    }

    /// Try providers in order. The first synced result wins; otherwise the
    /// first plain result; otherwise the not-found marker.
    async fn fetch_remote(&self, track: &TrackInfo) -> LyricsEntity {
        info!(
            "Fetching lyrics for: {} - {} (id: {}, providers: {:?})",
            track.artist,
            track.title,
            track.id,
            self.provider_names()
        );

        let query = LyricsQuery::for_track(track);
        let mut plain_fallback: Option<String> = None;

        for provider in &self.providers {
            match provider.fetch(&query).await {
                Ok(fetched) => {
                    let synced = fetched.result.is_synced();
                    match fetched.result.into_raw() {
                        Some(raw) if synced => {
                            info!(
                                "Found synced lyrics from {} (provider_id: {})",
                                provider.name(),
                                fetched.provider_id
                            );
                            return LyricsEntity::found(&track.id, raw);
                        }
                        Some(raw) => {
                            info!(
                                "Provider {} returned unsynced lyrics, trying others for synced",
                                provider.name()
                            );
                            plain_fallback.get_or_insert(raw);
                        }
                        None => {
                            info!("Provider {} returned no lyrics", provider.name());
                        }
                    }
                }
                Err(e) => {
                    warn!("Provider {} failed with error: {}", provider.name(), e);
                }
            }
        }

        if let Some(raw) = plain_fallback {
            return LyricsEntity::found(&track.id, raw);
        }

        info!(
            "No lyrics found for {} - {} (tried {} providers)",
            track.artist,
            track.title,
            self.providers.len()
        );
        LyricsEntity::not_found(&track.id)
    }

    async fn persist(&self, entity: &LyricsEntity) {
        let Some(store) = &self.store else {
            return;
        };

        if let Err(e) = store.upsert(entity).await {
            error!("Failed to store lyrics for {}: {}", entity.id, e);
            let _ = self.notice_tx.send(LyricsNotice::PersistenceFailed {
                track_id: entity.id.clone(),
                message: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::LyricsContent;
    use crate::error::{CoreError, Result};
    use crate::provider::{FetchedLyrics, LyricsResult};
    use crate::store::LyricsStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeProvider {
        name: &'static str,
        result: Option<LyricsResult>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn boxed(
            name: &'static str,
            result: Option<LyricsResult>,
        ) -> (Box<dyn LyricsProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = Self {
                name,
                result,
                calls: Arc::clone(&calls),
            };
            (Box::new(provider), calls)
        }
    }

    #[async_trait]
    impl LyricsProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, query: &LyricsQuery) -> std::result::Result<FetchedLyrics, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            match &self.result {
                Some(result) => Ok(FetchedLyrics {
                    result: result.clone(),
                    provider_id: "fake-1".to_string(),
                }),
                None => Err(CoreError::LyricsProviderFailed {
                    provider: self.name.to_string(),
                    reason: format!("offline while looking up {}", query.track_name),
                }),
            }
        }
    }

    /// Store whose writes always fail
    struct BrokenStore;

    #[async_trait]
    impl LyricsPersistence for BrokenStore {
        async fn get(&self, _id: &str) -> Result<Option<LyricsEntity>> {
            Ok(None)
        }

        async fn upsert(&self, _entity: &LyricsEntity) -> Result<()> {
            Err(CoreError::IoError(std::io::Error::other("disk full")))
        }

        async fn delete(&self, _id: &str) -> Result<bool> {
            Ok(false)
        }
    }

    fn track() -> TrackInfo {
        TrackInfo::new("track-1", "Song", "Artist")
    }

    async fn memory_store() -> Arc<LyricsStore> {
        Arc::new(LyricsStore::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_fetch() {
        let (provider, calls) =
            FakeProvider::boxed("fake", Some(LyricsResult::Synced("[00:01.00]a".to_string())));
        let repo = LyricsRepository::new(None, vec![provider]);
        let track = track();

        let (a, b, c) = tokio::join!(repo.get(&track), repo.get(&track), repo.get(&track));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(a.is_found());
    }

    #[tokio::test]
    async fn test_distinct_tracks_fetch_separately() {
        let (provider, calls) =
            FakeProvider::boxed("fake", Some(LyricsResult::Unsynced("la la".to_string())));
        let repo = LyricsRepository::new(None, vec![provider]);

        repo.get(&TrackInfo::new("a", "A", "X")).await;
        repo.get(&TrackInfo::new("b", "B", "X")).await;
        repo.get(&TrackInfo::new("a", "A", "X")).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_cached_as_not_found() {
        let (provider, calls) = FakeProvider::boxed("broken", None);
        let store = memory_store().await;
        let repo = LyricsRepository::new(Some(store.clone()), vec![provider]);

        let first = repo.get(&track()).await;
        let second = repo.get(&track()).await;

        assert_eq!(first.content, LyricsContent::NotFound);
        assert_eq!(second.content, LyricsContent::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stored = store.get("track-1").await.unwrap().unwrap();
        assert_eq!(stored.content, LyricsContent::NotFound);
    }

    #[tokio::test]
    async fn test_synced_preferred_over_earlier_plain() {
        let (plain, _) = FakeProvider::boxed("plain", Some(LyricsResult::Unsynced("plain".to_string())));
        let (missing, _) = FakeProvider::boxed("missing", Some(LyricsResult::NotFound));
        let (synced, _) =
            FakeProvider::boxed("synced", Some(LyricsResult::Synced("[00:01.00]s".to_string())));
        let repo = LyricsRepository::new(None, vec![plain, missing, synced]);

        let entity = repo.get(&track()).await;
        assert_eq!(entity.content, LyricsContent::Found("[00:01.00]s".to_string()));
    }

    #[tokio::test]
    async fn test_plain_used_when_no_synced() {
        let (broken, _) = FakeProvider::boxed("broken", None);
        let (plain, _) = FakeProvider::boxed("plain", Some(LyricsResult::Unsynced("plain".to_string())));
        let repo = LyricsRepository::new(None, vec![broken, plain]);

        let entity = repo.get(&track()).await;
        assert_eq!(entity.content, LyricsContent::Found("plain".to_string()));
    }

    #[tokio::test]
    async fn test_store_hit_skips_providers() {
        let (provider, calls) = FakeProvider::boxed("fake", Some(LyricsResult::NotFound));
        let store = memory_store().await;
        store
            .upsert(&LyricsEntity::found("track-1", "[00:02.00]stored"))
            .await
            .unwrap();
        let repo = LyricsRepository::new(Some(store), vec![provider]);

        let entity = repo.get(&track()).await;
        assert_eq!(entity.content, LyricsContent::Found("[00:02.00]stored".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_emits_notice() {
        let (provider, _) =
            FakeProvider::boxed("fake", Some(LyricsResult::Synced("[00:01.00]a".to_string())));
        let repo = LyricsRepository::new(Some(Arc::new(BrokenStore)), vec![provider]);
        let mut notices = repo.subscribe_notices();

        let entity = repo.get(&track()).await;
        assert!(entity.is_found());

        let notice = notices.try_recv().unwrap();
        assert!(matches!(
            &notice,
            LyricsNotice::PersistenceFailed { track_id, .. } if track_id == "track-1"
        ));
        assert!(notice.to_string().contains("disk full"));
        // Abandoned, not retried
        assert!(notices.try_recv().is_err());
        assert_eq!(repo.cached("track-1").await, Some(entity));
    }

    #[tokio::test]
    async fn test_refetch_replaces_entity() {
        let (provider, calls) =
            FakeProvider::boxed("fake", Some(LyricsResult::Synced("[00:01.00]new".to_string())));
        let store = memory_store().await;
        store.upsert(&LyricsEntity::not_found("track-1")).await.unwrap();
        let repo = LyricsRepository::new(Some(store.clone()), vec![provider]);

        assert!(!repo.get(&track()).await.is_found());
        let refreshed = repo.refetch(&track()).await;

        assert!(refreshed.is_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(repo.get(&track()).await.content, refreshed.content);
        assert_eq!(store.get("track-1").await.unwrap().unwrap().content, refreshed.content);
    }

    #[tokio::test]
    async fn test_update_and_invalidate() {
        let store = memory_store().await;
        let repo = LyricsRepository::new(Some(store.clone()), Vec::new());

        repo.update("track-1", "edited").await;
        assert_eq!(
            repo.cached("track-1").await.map(|e| e.content),
            Some(LyricsContent::Found("edited".to_string()))
        );

        repo.invalidate("track-1").await;
        assert!(repo.cached("track-1").await.is_none());
        // Reloaded from the store, not the (empty) provider list
        assert!(repo.get(&track()).await.is_found());
    }

    #[tokio::test]
    async fn test_update_during_lookup_is_not_overwritten() {
        let (provider, _) =
            FakeProvider::boxed("fake", Some(LyricsResult::Synced("[00:01.00]old".to_string())));
        let store = memory_store().await;
        let repo = LyricsRepository::new(Some(store.clone()), vec![provider]);

        let track = track();
        let (looked_up, edited) = tokio::join!(repo.get(&track), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            repo.update("track-1", "edited").await
        });

        // The caller that started first still gets its own result
        assert!(looked_up.is_found());
        assert_eq!(repo.cached("track-1").await, Some(edited.clone()));
        assert_eq!(store.get("track-1").await.unwrap().unwrap().content, edited.content);
    }

    #[tokio::test]
    async fn test_memory_capacity_evicts_finished_lookups() {
        let (provider, calls) =
            FakeProvider::boxed("fake", Some(LyricsResult::Unsynced("la".to_string())));
        let store = memory_store().await;
        let repo = LyricsRepository::new(Some(store), vec![provider]).with_memory_capacity(2);

        repo.get(&TrackInfo::new("a", "A", "X")).await;
        repo.get(&TrackInfo::new("b", "B", "X")).await;
        assert!(repo.cached("a").await.is_some());

        repo.get(&TrackInfo::new("c", "C", "X")).await;
        assert!(repo.cached("a").await.is_none());
        assert!(repo.cached("c").await.is_some());

        // Evicted tracks come back from the store, not the providers
        assert!(repo.get(&TrackInfo::new("a", "A", "X")).await.is_found());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
