//! Turns raw lyrics text into a [`LyricsDocument`].
//!
//! Text whose first non-blank character is `[` is treated as time-tagged LRC;
//! anything else is plain text with synthetic, order-only timestamps.

use crate::document::{LyricsDocument, LyricsEntry, LyricsMetadata};
use crate::provider::LyricsPayload;
use crate::time::apply_offset_ms;
use std::sync::Arc;
use tracing::debug;

const LOG_TARGET: &str = "lyricsync::parser";

/// Spacing of the synthetic timestamps given to unsynced lines.
pub const UNSYNCED_LINE_SPACING_MS: u64 = 100;

/// Load state of the lyrics for the current track.
#[derive(Debug, Clone, Default)]
pub enum LyricsStatus {
    /// Lookup not attempted or still in flight
    #[default]
    NotLoaded,
    /// Lookup completed without a result
    NotFound,
    Loaded(Arc<LyricsDocument>),
}

impl LyricsStatus {
    #[must_use]
    pub const fn document(&self) -> Option<&Arc<LyricsDocument>> {
        match self {
            Self::Loaded(document) => Some(document),
            _ => None,
        }
    }
}

/// Parse a collaborator payload, keeping "not loaded" and "not found" apart.
#[must_use]
pub fn parse_payload(payload: &LyricsPayload) -> LyricsStatus {
    match payload {
        LyricsPayload::NotLoaded => LyricsStatus::NotLoaded,
        LyricsPayload::NotFound => LyricsStatus::NotFound,
        LyricsPayload::Raw(raw) => LyricsStatus::Loaded(Arc::new(parse(raw))),
    }
}

/// Parse raw lyrics text. Pure: the same input always yields the same entries.
#[must_use]
pub fn parse(raw: &str) -> LyricsDocument {
    if is_time_tagged(raw) {
        parse_synced(raw.trim())
    } else {
        // Leading blank lines still count, so entry indices match line numbers
        parse_plain(raw.trim_end())
    }
}

/// Whether `raw` takes the time-tagged path of [`parse`].
#[must_use]
pub fn is_time_tagged(raw: &str) -> bool {
    raw.trim_start().starts_with('[')
}

fn parse_plain(text: &str) -> LyricsDocument {
    if text.trim_start().is_empty() {
        return LyricsDocument::new(Vec::new(), false, LyricsMetadata::default());
    }

    let entries = text
        .lines()
        .zip(0_u64..)
        .map(|(line, index)| {
            LyricsEntry::new(
                index.saturating_mul(UNSYNCED_LINE_SPACING_MS),
                line.trim_end(),
            )
        })
        .collect();

    LyricsDocument::new(entries, false, LyricsMetadata::default())
}

fn parse_synced(text: &str) -> LyricsDocument {
    let mut metadata = LyricsMetadata::default();
    let mut entries = Vec::new();
    let mut dropped = 0_usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((tag, value)) = parse_id_tag(line) {
            apply_id_tag(&mut metadata, &tag, value);
            continue;
        }

        match parse_timed_line(line) {
            Some((timestamps, text)) => {
                entries.extend(
                    timestamps
                        .into_iter()
                        .map(|time_ms| LyricsEntry::new(time_ms, text)),
                );
            }
            None => dropped += 1,
        }
    }

    if metadata.offset_ms != 0 {
        for entry in &mut entries {
            entry.time_ms = apply_offset_ms(entry.time_ms, metadata.offset_ms);
        }
    }

    // Stable, so lines sharing a timestamp keep their source order
    entries.sort_by_key(|entry| entry.time_ms);

    if dropped > 0 {
        debug!(target: LOG_TARGET, "Dropped {} line(s) without a time tag", dropped);
    }

    LyricsDocument::new(entries, true, metadata)
}

fn apply_id_tag(metadata: &mut LyricsMetadata, tag: &str, value: &str) {
    let value = value.trim();
    match tag.to_ascii_lowercase().as_str() {
        "ti" => metadata.title = Some(value.to_string()),
        "ar" => metadata.artist = Some(value.to_string()),
        "al" => metadata.album = Some(value.to_string()),
        "au" => metadata.author = Some(value.to_string()),
        "by" => metadata.creator = Some(value.to_string()),
        "length" => metadata.length_ms = parse_timestamp_ms(value),
        "offset" => {
            if let Ok(offset) = value.trim_start_matches('+').parse::<i64>() {
                metadata.offset_ms = offset;
            }
        }
        _ => {} // Ignore unknown tags
    }
}

/// Parse an ID tag like `[ti:Title]`. The tag name must start with a letter so
/// timestamps are never mistaken for tags.
fn parse_id_tag(line: &str) -> Option<(String, &str)> {
    let content = line.strip_prefix('[')?.strip_suffix(']')?;
    let (tag, value) = content.split_once(':')?;

    let mut chars = tag.chars();
    let starts_alphabetic = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_alphabetic || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some((tag.to_string(), value))
}

/// Parse `[mm:ss.xx]text`, including repeated prefixes like `[00:05.00][00:15.00]text`.
fn parse_timed_line(line: &str) -> Option<(Vec<u64>, &str)> {
    let mut remaining = line;
    let mut timestamps = Vec::new();

    while let Some(rest) = remaining.strip_prefix('[') {
        let Some(end) = rest.find(']') else {
            break;
        };
        let Some(time_ms) = parse_timestamp_ms(&rest[..end]) else {
            break;
        };
        timestamps.push(time_ms);
        remaining = &rest[end + 1..];
    }

    if timestamps.is_empty() {
        None
    } else {
        Some((timestamps, remaining.trim()))
    }
}

/// Parse `mm:ss`, `mm:ss.x`, `mm:ss.xx`, `mm:ss.xxx` or `mm:ss:xx` into milliseconds.
fn parse_timestamp_ms(s: &str) -> Option<u64> {
    let (minutes, rest) = s.trim().split_once(':')?;
    let minutes = parse_digits(minutes)?;

    let (seconds, fraction) = match rest.split_once(['.', ':']) {
        Some((seconds, fraction)) => (seconds, Some(fraction)),
        None => (rest, None),
    };
    let seconds = parse_digits(seconds)?;

    let fraction_ms = match fraction {
        None => 0,
        Some(digits) => {
            let value = parse_digits(digits)?;
            match digits.len() {
                1 => value * 100,
                2 => value * 10,
                3 => value,
                _ => return None,
            }
        }
    };

    Some(
        minutes
            .saturating_mul(60_000)
            .saturating_add(seconds.saturating_mul(1000))
            .saturating_add(fraction_ms),
    )
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
