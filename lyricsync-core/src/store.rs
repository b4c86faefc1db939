use crate::entity::{LyricsContent, LyricsEntity};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

const SCHEMA_SQL: &str = r"
-- Lyrics per track id; lyrics holds the raw text or the not-found marker
CREATE TABLE IF NOT EXISTS lyrics (
    id TEXT PRIMARY KEY NOT NULL,
    lyrics TEXT NOT NULL,
    fetched_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lyrics_fetched_at ON lyrics(fetched_at);
";

/// Local persistence for lyrics entities, keyed by track id
#[async_trait]
pub trait LyricsPersistence: Send + Sync {
    /// Look up the entity stored for a track
    async fn get(&self, id: &str) -> Result<Option<LyricsEntity>>;

    /// Insert the entity, replacing any previous one for the same track
    async fn upsert(&self, entity: &LyricsEntity) -> Result<()>;

    /// Remove the entity for a track. Returns whether a row was deleted.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// SQLite-based lyrics store
pub struct LyricsStore {
    conn: Connection,
}

impl LyricsStore {
    /// Open the store at the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or opened.
    pub async fn new() -> Result<Self> {
        let path = crate::paths::lyrics_store_db_path();
        Self::open(&path).await
    }

    /// Open a store at a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: &Path) -> Result<Self> {
        info!("Opening lyrics store at {:?}", path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            Ok(())
        })
        .await?;

        info!("Lyrics store initialized");
        Ok(Self { conn })
    }

    /// Open a throwaway in-memory store
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Delete entries older than the TTL
    ///
    /// # Errors
    ///
    /// Returns an error if the database cleanup fails.
    pub async fn cleanup(&self, ttl_days: u32) -> Result<usize> {
        let cutoff = Utc::now().timestamp() - (i64::from(ttl_days) * 24 * 60 * 60);

        let deleted = self
            .conn
            .call(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM lyrics WHERE fetched_at < ?1",
                    rusqlite::params![cutoff],
                )?;
                Ok(deleted)
            })
            .await?;

        info!("Removed {} stale lyrics entries (ttl: {} days)", deleted, ttl_days);
        Ok(deleted)
    }

    /// Checkpoint WAL for clean shutdown
    ///
    /// # Errors
    ///
    /// Returns an error if the WAL checkpoint fails.
    pub async fn checkpoint(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl LyricsPersistence for LyricsStore {
    async fn get(&self, id: &str) -> Result<Option<LyricsEntity>> {
        debug!("Looking up lyrics in store: {}", id);
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare_cached("SELECT id, lyrics, fetched_at FROM lyrics WHERE id = ?1")?;

                let result = stmt
                    .query_row(rusqlite::params![id], |row| {
                        Ok(LyricsEntity {
                            id: row.get(0)?,
                            content: LyricsContent::from_stored(row.get(1)?),
                            fetched_at: DateTime::from_timestamp(row.get::<_, i64>(2)?, 0)
                                .unwrap_or_else(Utc::now),
                        })
                    })
                    .optional()?;

                Ok(result)
            })
            .await
            .map_err(Into::into)
    }

    async fn upsert(&self, entity: &LyricsEntity) -> Result<()> {
        info!(
            "Storing lyrics for {} (found: {})",
            entity.id,
            entity.is_found()
        );
        let id = entity.id.clone();
        let lyrics = entity.content.as_stored().to_string();
        let fetched_at = entity.fetched_at.timestamp();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r"
                    INSERT INTO lyrics (id, lyrics, fetched_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(id) DO UPDATE SET
                        lyrics = excluded.lyrics,
                        fetched_at = excluded.fetched_at
                ",
                    rusqlite::params![id, lyrics, fetched_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let deleted = conn.execute("DELETE FROM lyrics WHERE id = ?1", rusqlite::params![id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Into::into)
    }
}
