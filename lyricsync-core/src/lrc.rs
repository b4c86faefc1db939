use crate::time::duration_from_millis;
use serde::Serialize;
use std::time::Duration;

/// Timestamp of the head entry that stands for "before the first line"
pub const HEAD_TIMESTAMP: i64 = -1;

/// Spacing between synthesized timestamps for unsynced lyrics
pub const UNSYNCED_LINE_INTERVAL_MS: i64 = 100;

/// A single line of lyrics with its start time in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricsEntry {
    pub timestamp: i64,
    pub text: String,
}

impl LyricsEntry {
    pub fn new(timestamp: i64, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }

    /// The sentinel entry placed before the first real line
    #[must_use]
    pub const fn head() -> Self {
        Self {
            timestamp: HEAD_TIMESTAMP,
            text: String::new(),
        }
    }

    #[must_use]
    pub fn is_head(&self) -> bool {
        self.timestamp == HEAD_TIMESTAMP && self.text.is_empty()
    }
}

/// LRC metadata from ID tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LrcMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub author: Option<String>,
    pub length_ms: Option<i64>,
    /// Milliseconds, can be negative. Already applied to every entry.
    pub offset: i64,
}

/// Lyrics parsed from a raw string, ordered by timestamp
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedLyrics {
    pub metadata: LrcMetadata,
    pub entries: Vec<LyricsEntry>,
    /// False when timestamps were synthesized from plain text
    pub synced: bool,
}

impl ParsedLyrics {
    /// Parse raw lyrics.
    ///
    /// Text starting with `[` is read as LRC; anything else becomes one entry
    /// per line with timestamps `0, 100, 200, ...`. Lines that cannot be read
    /// are dropped individually, so this never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim_start_matches('\u{feff}');
        if raw.trim_start().starts_with('[') {
            parse_synced(raw)
        } else {
            parse_unsynced(raw)
        }
    }

    /// Prepend the head entry to synced lyrics, if not already present
    #[must_use]
    pub fn with_head_entry(mut self) -> Self {
        let has_head = self.entries.first().is_some_and(LyricsEntry::is_head);
        if self.synced && !has_head {
            self.entries.insert(0, LyricsEntry::head());
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the line active at `position_ms`, see [`locate`]
    #[must_use]
    pub fn current_line_index(&self, position_ms: i64) -> Option<usize> {
        locate(&self.entries, position_ms)
    }

    /// The line active at `position_ms`
    #[must_use]
    pub fn current_line(&self, position_ms: i64) -> Option<&LyricsEntry> {
        self.current_line_index(position_ms)
            .map(|index| &self.entries[index])
    }

    /// Get lines around the current position for display
    #[must_use]
    pub fn visible_lines(&self, position_ms: i64, before: usize, after: usize) -> &[LyricsEntry] {
        let current_idx = self.current_line_index(position_ms).unwrap_or(0);

        let start = current_idx.saturating_sub(before);
        let end = current_idx
            .saturating_add(after)
            .saturating_add(1)
            .min(self.entries.len());

        self.entries.get(start..end).unwrap_or_default()
    }

    /// Position to seek to when the line at `index` is selected.
    ///
    /// Unsynced lyrics have no meaningful timestamps and the head entry has no
    /// line to jump to, so both yield `None`.
    #[must_use]
    pub fn seek_target(&self, index: usize) -> Option<Duration> {
        if !self.synced {
            return None;
        }
        let entry = self.entries.get(index)?;
        if entry.is_head() {
            return None;
        }
        Some(duration_from_millis(entry.timestamp))
    }

    /// Lyrics text without timing, one line per entry
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.entries
            .iter()
            .filter(|e| !e.is_head())
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serialize back to LRC.
    ///
    /// The offset tag is not written since it is already folded into the
    /// timestamps. Unsynced lyrics serialize to their plain text.
    #[must_use]
    pub fn to_lrc(&self) -> String {
        use std::fmt::Write;

        if !self.synced {
            return self.plain_text();
        }

        let mut output = String::new();

        if let Some(ref title) = self.metadata.title {
            let _ = writeln!(output, "[ti:{title}]");
        }
        if let Some(ref artist) = self.metadata.artist {
            let _ = writeln!(output, "[ar:{artist}]");
        }
        if let Some(ref album) = self.metadata.album {
            let _ = writeln!(output, "[al:{album}]");
        }
        if let Some(ref author) = self.metadata.author {
            let _ = writeln!(output, "[au:{author}]");
        }
        if let Some(length) = self.metadata.length_ms {
            let _ = writeln!(output, "[length:{}]", format_timestamp(length));
        }

        for entry in self.entries.iter().filter(|e| !e.is_head()) {
            let _ = writeln!(output, "[{}]{}", format_timestamp(entry.timestamp), entry.text);
        }

        output
    }
}

/// Find the index of the last entry whose timestamp is at or before
/// `position_ms`.
///
/// `entries` must be sorted by timestamp. Returns `None` when the list is
/// empty or the position precedes every entry. Among equal timestamps the
/// last one wins.
#[must_use]
pub fn locate(entries: &[LyricsEntry], position_ms: i64) -> Option<usize> {
    entries
        .partition_point(|entry| entry.timestamp <= position_ms)
        .checked_sub(1)
}

/// Format milliseconds as an LRC timestamp (mm:ss.xx)
#[must_use]
pub fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let minutes = ms / 60_000;
    let seconds = (ms / 1000) % 60;
    let hundredths = (ms % 1000) / 10;

    format!("{minutes:02}:{seconds:02}.{hundredths:02}")
}

fn parse_unsynced(input: &str) -> ParsedLyrics {
    let entries = input
        .lines()
        .enumerate()
        .map(|(index, line)| {
            let timestamp = i64::try_from(index)
                .unwrap_or(i64::MAX)
                .saturating_mul(UNSYNCED_LINE_INTERVAL_MS);
            LyricsEntry::new(timestamp, line.trim())
        })
        .collect();

    ParsedLyrics {
        metadata: LrcMetadata::default(),
        entries,
        synced: false,
    }
}

fn parse_synced(input: &str) -> ParsedLyrics {
    let mut metadata = LrcMetadata::default();
    let mut entries = Vec::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((tag, value)) = parse_id_tag(line) {
            match tag.to_ascii_lowercase().as_str() {
                "ti" => metadata.title = Some(value.to_string()),
                "ar" => metadata.artist = Some(value.to_string()),
                "al" => metadata.album = Some(value.to_string()),
                "au" => metadata.author = Some(value.to_string()),
                "length" => metadata.length_ms = parse_timestamp(value),
                "offset" => {
                    if let Ok(offset) = value.parse::<i64>() {
                        metadata.offset = offset;
                    }
                }
                _ => {}
            }
            continue;
        }

        if let Some(parsed) = parse_timed_line(line) {
            entries.extend(parsed);
        }
    }

    // A positive offset makes lyrics appear sooner
    if metadata.offset != 0 {
        for entry in &mut entries {
            entry.timestamp = entry.timestamp.saturating_sub(metadata.offset).max(0);
        }
    }

    // Stable: equal timestamps keep file order
    entries.sort_by_key(|e| e.timestamp);

    ParsedLyrics {
        metadata,
        entries,
        synced: true,
    }
}

/// Parse an ID tag like [ti:Title] or [offset:+250]
fn parse_id_tag(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    let (tag, value) = rest[..end].split_once(':')?;

    // Timestamps have numeric "tags"
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some((tag, value.trim()))
}

/// Parse a lyric line like [00:12.34]Hello or [00:05.00][00:15.00]Repeated.
///
/// The line is dropped when its first bracket is not a valid timestamp.
/// Brackets after at least one timestamp that fail to parse are kept as text.
fn parse_timed_line(line: &str) -> Option<Vec<LyricsEntry>> {
    let mut remaining = line;
    let mut timestamps = Vec::new();

    while let Some(rest) = remaining.strip_prefix('[') {
        let Some(end) = rest.find(']') else {
            break;
        };
        let Some(timestamp) = parse_timestamp(&rest[..end]) else {
            break;
        };
        timestamps.push(timestamp);
        remaining = &rest[end + 1..];
    }

    if timestamps.is_empty() {
        return None;
    }

    let text = remaining.trim();
    Some(
        timestamps
            .into_iter()
            .map(|timestamp| LyricsEntry::new(timestamp, text))
            .collect(),
    )
}

/// Parse "mm:ss", "mm:ss.x", "mm:ss.xx", "mm:ss.xxx" or "mm:ss:xx" into
/// milliseconds
fn parse_timestamp(s: &str) -> Option<i64> {
    let mut parts = s.trim().split(':');
    let minutes = parse_digits(parts.next()?)?;
    let second_part = parts.next()?;
    let hundredths_part = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let (seconds, fraction_ms) = match hundredths_part {
        Some(fraction) => (parse_digits(second_part)?, parse_fraction(fraction)?),
        None => match second_part.split_once('.') {
            Some((seconds, fraction)) => (parse_digits(seconds)?, parse_fraction(fraction)?),
            None => (parse_digits(second_part)?, 0),
        },
    };

    minutes
        .checked_mul(60_000)?
        .checked_add(seconds.checked_mul(1000)?)?
        .checked_add(fraction_ms)
}

fn parse_digits(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Fraction of a second, scaled by its digit count and truncated to ms
fn parse_fraction(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = &s[..s.len().min(3)];
    let value: i64 = digits.parse().ok()?;
    Some(match digits.len() {
        1 => value * 100,
        2 => value * 10,
        _ => value,
    })
}
