use anyhow::Result;
use clap::Args;
use lyricsync_core::{Config, LyricsStore};
use tracing::info;

#[derive(Args)]
pub struct CleanupArgs {
    /// Override `lyrics.cache_ttl_days` from config
    #[arg(long)]
    pub ttl_days: Option<u32>,
}

pub async fn execute(args: &CleanupArgs, config: &Config) -> Result<()> {
    let ttl_days = args.ttl_days.unwrap_or(config.lyrics.cache_ttl_days);

    match run(ttl_days, config).await? {
        Some(removed) => println!("Removed {removed} entries older than {ttl_days} days"),
        None => println!("Lyrics store is disabled, nothing to clean up"),
    }
    Ok(())
}

/// Rows removed, or `None` when the store is disabled and was left untouched
async fn run(ttl_days: u32, config: &Config) -> Result<Option<usize>> {
    if !config.lyrics.cache_enabled {
        info!("Lyrics store disabled, skipping cleanup");
        return Ok(None);
    }

    let store = LyricsStore::new().await?;
    let removed = store.cleanup(ttl_days).await?;
    store.checkpoint().await?;

    info!("Lyrics store cleanup finished");
    Ok(Some(removed))
}
