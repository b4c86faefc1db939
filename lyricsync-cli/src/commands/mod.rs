//! Subcommands of the `lyricsync` binary

pub mod cleanup;
pub mod fetch;
pub mod follow;
pub mod show;

use lyricsync_core::config::{LyricsProviderType, TextAlignment};
use lyricsync_core::{Config, LyricsEntry, LyricsProvider, TrackInfo};
use lyricsync_lyrics_lrclib::LrclibProvider;
use std::path::Path;
use tracing::{error, info};

/// Column width used to lay out lines for `preferences.text_alignment`
pub const DEFAULT_WIDTH: usize = 72;

/// Apply the configured alignment to rendered lines
pub fn align_lines(lines: Vec<String>, alignment: TextAlignment, width: usize) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| alignment.align(&line, width))
        .collect()
}

/// Build the providers listed in config, skipping any that fail to initialize
pub fn create_providers(config: &Config) -> Vec<Box<dyn LyricsProvider>> {
    let providers: Vec<Box<dyn LyricsProvider>> = config
        .lyrics
        .providers
        .iter()
        .filter_map(|provider_type| -> Option<Box<dyn LyricsProvider>> {
            match provider_type {
                LyricsProviderType::Lrclib => match LrclibProvider::new() {
                    Ok(provider) => Some(Box::new(provider)),
                    Err(e) => {
                        error!("Failed to create LRCLIB provider: {}", e);
                        None
                    }
                },
            }
        })
        .collect();

    let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
    info!("Initialized {} lyrics provider(s): {:?}", providers.len(), names);
    providers
}

/// Track metadata for a local lyrics file, keyed by its path
pub fn track_for_file(path: &Path, title: Option<&str>, artist: Option<&str>) -> TrackInfo {
    let stem = path
        .file_stem()
        .map_or_else(|| "Unknown".to_string(), |s| s.to_string_lossy().into_owned());

    TrackInfo::new(
        format!("file:{}", path.display()),
        title.unwrap_or(&stem),
        artist.unwrap_or("Unknown"),
    )
}

/// One display line: `[mm:ss.xx] text`, with an empty marker for the head entry
pub fn format_entry(entry: &LyricsEntry) -> String {
    if entry.is_head() {
        return "[--:--.--]".to_string();
    }
    format!(
        "[{}] {}",
        lyricsync_core::lrc::format_timestamp(entry.timestamp),
        entry.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_for_file_uses_stem() {
        let track = track_for_file(Path::new("/music/Some Song.lrc"), None, Some("Band"));
        assert_eq!(track.id, "file:/music/Some Song.lrc");
        assert_eq!(track.title, "Some Song");
        assert_eq!(track.artist, "Band");
    }

    #[test]
    fn test_format_entry() {
        assert_eq!(format_entry(&LyricsEntry::new(83_450, "hello")), "[01:23.45] hello");
        assert_eq!(format_entry(&LyricsEntry::head()), "[--:--.--]");
    }

    #[test]
    fn test_align_lines() {
        let lines = vec!["> [00:01.00] one".to_string(), String::new()];
        assert_eq!(
            align_lines(lines.clone(), TextAlignment::Right, 20),
            vec!["    > [00:01.00] one".to_string(), String::new()]
        );
        assert_eq!(align_lines(lines.clone(), TextAlignment::Left, 20), lines);
    }

    #[test]
    fn test_create_providers_from_default_config() {
        let providers = create_providers(&Config::default());
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name(), "lrclib");
    }
}
