use anyhow::Result;
use clap::Args;
use lyricsync_core::{
    Config, LyricsEntity, LyricsPersistence, LyricsRepository, LyricsStore, TrackInfo,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::create_providers;

#[derive(Args)]
pub struct FetchArgs {
    /// Stable track identifier used as the storage key
    #[arg(long)]
    pub id: String,

    /// Track title
    #[arg(long)]
    pub title: String,

    /// Track artist
    #[arg(long)]
    pub artist: String,

    /// Album name, improves matching
    #[arg(long)]
    pub album: Option<String>,

    /// Track length in seconds, improves matching
    #[arg(long)]
    pub duration: Option<u64>,

    /// Print the parsed lyrics as JSON instead of raw text
    #[arg(long)]
    pub json: bool,
}

impl FetchArgs {
    fn track(&self) -> TrackInfo {
        let mut track = TrackInfo::new(&self.id, &self.title, &self.artist);
        if let Some(ref album) = self.album {
            track = track.with_album(album);
        }
        if let Some(secs) = self.duration {
            track = track.with_duration(Duration::from_secs(secs));
        }
        track
    }
}

pub async fn execute(args: &FetchArgs, config: &Config, refetch: bool) -> Result<()> {
    let store: Option<Arc<dyn LyricsPersistence>> = if config.lyrics.cache_enabled {
        Some(Arc::new(LyricsStore::new().await?))
    } else {
        info!("Lyrics store disabled, results will not be saved");
        None
    };

    let repository = LyricsRepository::new(store, create_providers(config));
    let mut notices = repository.subscribe_notices();

    let track = args.track();
    let entity = if refetch {
        repository.refetch(&track).await
    } else {
        repository.get(&track).await
    };

    while let Ok(notice) = notices.try_recv() {
        warn!("{}", notice);
        eprintln!("{notice}");
    }

    print_entity(&entity, args.json)
}

fn print_entity(entity: &LyricsEntity, json: bool) -> Result<()> {
    match entity.parse() {
        Some(lyrics) if json => println!("{}", serde_json::to_string_pretty(&lyrics)?),
        Some(_) => println!("{}", entity.content.as_stored()),
        None => eprintln!("No lyrics found for {}", entity.id),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_from_args() {
        let args = FetchArgs {
            id: "t1".to_string(),
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            album: Some("Album".to_string()),
            duration: Some(200),
            json: false,
        };

        let track = args.track();
        assert_eq!(track.id, "t1");
        assert_eq!(track.album.as_deref(), Some("Album"));
        assert_eq!(track.duration_secs(), Some(200));
    }
}
