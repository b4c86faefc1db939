use anyhow::{Context, Result};
use clap::Args;
use lyricsync_core::{Config, ParsedLyrics};
use std::path::PathBuf;

use super::{align_lines, format_entry, DEFAULT_WIDTH};

#[derive(Args)]
pub struct ShowArgs {
    /// LRC or plain-text lyrics file
    pub file: PathBuf,

    /// Print the parsed lyrics as JSON
    #[arg(long)]
    pub json: bool,

    /// Prepend the head entry to synced lyrics
    #[arg(long)]
    pub head: bool,

    /// Only print the lines around this position (milliseconds)
    #[arg(long)]
    pub at: Option<i64>,

    /// Lines of context before and after `--at`
    #[arg(long, default_value_t = 2)]
    pub context: usize,

    /// Column width for `preferences.text_alignment`
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: usize,
}

pub fn execute(args: &ShowArgs, config: &Config) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let mut lyrics = ParsedLyrics::parse(&raw);
    if args.head {
        lyrics = lyrics.with_head_entry();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&lyrics)?);
        return Ok(());
    }

    let lines = render(&lyrics, args.at, args.context);
    for line in align_lines(lines, config.preferences.text_alignment, args.width) {
        println!("{line}");
    }
    Ok(())
}

fn render(lyrics: &ParsedLyrics, at: Option<i64>, context: usize) -> Vec<String> {
    let Some(position) = at else {
        return lyrics.entries.iter().map(format_entry).collect();
    };

    let current = lyrics.current_line_index(position);
    let window = lyrics.visible_lines(position, context, context);
    let first = current.unwrap_or(0).saturating_sub(context);

    window
        .iter()
        .enumerate()
        .map(|(offset, entry)| {
            let marker = if Some(first + offset) == current {
                ">"
            } else {
                " "
            };
            format!("{marker} {}", format_entry(entry))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SONG: &str = "[ti:Song]\n[00:01.00]one\n[00:02.00]two\n[00:03.00]three\n[00:04.00]four";

    #[test]
    fn test_render_all() {
        let lyrics = ParsedLyrics::parse(SONG);
        let lines = render(&lyrics, None, 2);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "[00:01.00] one");
    }

    #[test]
    fn test_render_marks_current_line() {
        let lyrics = ParsedLyrics::parse(SONG);
        let lines = render(&lyrics, Some(2_500), 1);
        assert_eq!(
            lines,
            vec![
                "  [00:01.00] one".to_string(),
                "> [00:02.00] two".to_string(),
                "  [00:03.00] three".to_string(),
            ]
        );
    }
}
