use anyhow::{Context, Result};
use clap::Args;
use lyricsync_core::{
    Config, LyricsEntry, ParsedLyrics, PositionSource, SimulatedPlayer, SyncEngine, SyncEvent,
    SyncOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{align_lines, format_entry, track_for_file, DEFAULT_WIDTH};

/// Tail after the last line when the file carries no `[length:]` tag
const TRAILING_TIME: Duration = Duration::from_secs(5);

#[derive(Args)]
pub struct FollowArgs {
    /// LRC or plain-text lyrics file
    pub file: PathBuf,

    /// Start playback at this position (milliseconds)
    #[arg(long, default_value_t = 0)]
    pub start_ms: u64,

    /// Lines of context to print around the active line
    #[arg(long, default_value_t = 0)]
    pub context: usize,

    /// Column width for `preferences.text_alignment`
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: usize,
}

pub async fn execute(args: &FollowArgs, config: &Config) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let lyrics = ParsedLyrics::parse(&raw);

    let title = lyrics.metadata.title.clone();
    let artist = lyrics.metadata.artist.clone();
    let track = track_for_file(&args.file, title.as_deref(), artist.as_deref())
        .with_duration(track_length(&lyrics));

    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let engine = SyncEngine::new(SyncOptions::from_config(config));
    let player = Arc::new(SimulatedPlayer::new());
    let mut rx = engine.subscribe();

    info!(
        "Following {} - {} ({} lines)",
        track.artist,
        track.title,
        lyrics.len()
    );
    player.play(track, Duration::from_millis(args.start_ms));
    engine.update_state(player.snapshot()).await;
    engine.set_lyrics(lyrics).await;

    let source: Arc<dyn PositionSource> = player.clone();
    let poller = engine.start_polling(source, config.poll_interval(), cancel_token.clone());

    let mut finish_check = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            _ = finish_check.tick() => {
                if player.is_finished() {
                    info!("Reached end of track");
                    cancel_token.cancel();
                }
            }
            event = rx.recv() => match event {
                Ok(SyncEvent::LineChanged { index, .. }) => {
                    let entries = engine.entries().await;
                    let lines = render_active(&entries, index, args.context);
                    for line in align_lines(lines, engine.options().text_alignment, args.width) {
                        println!("{line}");
                    }
                    if args.context > 0 {
                        println!();
                    }
                }
                Ok(SyncEvent::Notice { message }) => eprintln!("{message}"),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!("Follow lagged by {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    }

    poller.await?;
    Ok(())
}

/// Track length from the `[length:]` tag, otherwise a little past the last line
fn track_length(lyrics: &ParsedLyrics) -> Duration {
    if let Some(ms) = lyrics.metadata.length_ms.filter(|&ms| ms > 0) {
        return lyricsync_core::time::duration_from_millis(ms);
    }
    let last = lyrics.entries.last().map_or(0, |e| e.timestamp);
    lyricsync_core::time::duration_from_millis(last) + TRAILING_TIME
}

/// Lines to print when the active line becomes `index`
fn render_active(entries: &[LyricsEntry], index: Option<usize>, context: usize) -> Vec<String> {
    let Some(index) = index else {
        return vec!["...".to_string()];
    };
    if context == 0 {
        return entries
            .get(index)
            .map(|entry| vec![format_entry(entry)])
            .unwrap_or_default();
    }

    let start = index.saturating_sub(context);
    let end = index.saturating_add(context).saturating_add(1).min(entries.len());
    entries
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(offset, entry)| {
            let marker = if start + offset == index { ">" } else { " " };
            format!("{marker} {}", format_entry(entry))
        })
        .collect()
}
