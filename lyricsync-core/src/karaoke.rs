//! Per-word karaoke fill for the active line.
//!
//! Lines carry a single timestamp, so word timing is estimated: the line's
//! window is compressed so the fill completes before the next line activates,
//! then sliced between words in proportion to their length.

use crate::config::KaraokeConfig;
use crate::document::LyricsDocument;
use crate::time::ms_to_f64;
use serde::Serialize;

/// Compress a line window so the fill finishes ahead of the next line.
///
/// Always within `[ceil(raw / 2), raw]`.
#[must_use]
pub const fn compress_duration(raw_ms: u64, compression_ms: u64) -> u64 {
    let floor = raw_ms - raw_ms / 2;
    let trimmed = raw_ms.saturating_sub(compression_ms);
    if trimmed > floor {
        trimmed
    } else {
        floor
    }
}

/// A word's slice of the line and how much of it is highlighted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordFill {
    pub text: String,
    /// Offset from the line start, milliseconds
    pub start_ms: f64,
    pub end_ms: f64,
    /// Highlighted share of the word, in `[0, 1]`
    pub fraction: f32,
    /// `(solid_until, clear_from)` boundary of the highlight gradient
    pub gradient: (f32, f32),
}

impl WordFill {
    /// Fill fraction at `elapsed_ms` after the line start (lead included).
    ///
    /// 0 up to `start_ms`, 1 from `end_ms` on, linear in between.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn fraction_at(start_ms: f64, end_ms: f64, elapsed_ms: f64) -> f32 {
        if elapsed_ms >= end_ms {
            1.0
        } else if elapsed_ms <= start_ms {
            0.0
        } else {
            ((elapsed_ms - start_ms) / (end_ms - start_ms)) as f32
        }
    }

    /// Gradient boundary for renderers as `(solid_until, clear_from)` fractions
    /// of the word width, with a soft edge `softness` wide.
    #[must_use]
    pub fn gradient_stops(&self, softness: f32) -> (f32, f32) {
        let softness = softness.max(0.0);
        let head = self.fraction * (1.0 + softness);
        ((head - softness).clamp(0.0, 1.0), head.clamp(0.0, 1.0))
    }
}

/// Word slice layout, before any position is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct WordSpan<'a> {
    pub text: &'a str,
    pub start_ms: f64,
    pub end_ms: f64,
}

/// Lay out `text`'s words over `active_ms`.
///
/// Each word is weighted by its length plus its trailing space (none for the
/// last word) over the whole text length; slices are contiguous.
#[must_use]
pub fn layout_words(text: &str, active_ms: u64) -> Vec<WordSpan<'_>> {
    let total = text.chars().count();
    if total == 0 {
        return Vec::new();
    }

    let active = ms_to_f64(active_ms);
    let total = ms_to_f64(total as u64);
    let words: Vec<&str> = text.split(' ').collect();
    let last = words.len() - 1;

    let mut consumed = 0_u64;
    words
        .into_iter()
        .enumerate()
        .map(|(i, word)| {
            let weight = word.chars().count() as u64 + u64::from(i < last);
            let start_ms = active * ms_to_f64(consumed) / total;
            consumed += weight;
            let end_ms = active * ms_to_f64(consumed) / total;
            WordSpan {
                text: word,
                start_ms,
                end_ms,
            }
        })
        .collect()
}

/// Estimates word fills for the active line of a document.
#[derive(Debug, Clone, Copy)]
pub struct WordTimingEstimator {
    lead_ms: u64,
    compression_ms: u64,
    last_line_ms: u64,
    edge_softness: f32,
}

impl WordTimingEstimator {
    #[must_use]
    pub const fn new(lead_ms: u64, compression_ms: u64, last_line_ms: u64) -> Self {
        Self {
            lead_ms,
            compression_ms,
            last_line_ms,
            edge_softness: 0.0,
        }
    }

    /// Soft gradient edge applied to every estimated word.
    #[must_use]
    pub const fn with_edge_softness(mut self, edge_softness: f32) -> Self {
        self.edge_softness = edge_softness;
        self
    }

    /// Duration the fill of a line spans, given its start and the next line's start.
    #[must_use]
    pub const fn active_duration_ms(&self, line_start_ms: u64, next_start_ms: Option<u64>) -> u64 {
        let raw_ms = match next_start_ms {
            Some(next) => next.saturating_sub(line_start_ms),
            None => self.last_line_ms,
        };
        compress_duration(raw_ms, self.compression_ms)
    }

    /// Word fills for `text` at `position_ms`.
    #[must_use]
    pub fn estimate(
        &self,
        text: &str,
        line_start_ms: u64,
        next_start_ms: Option<u64>,
        position_ms: u64,
    ) -> Vec<WordFill> {
        let active_ms = self.active_duration_ms(line_start_ms, next_start_ms);
        // Signed: with lookahead the line is active slightly before its timestamp
        let elapsed_ms =
            ms_to_f64(position_ms) - ms_to_f64(line_start_ms) + ms_to_f64(self.lead_ms);

        layout_words(text, active_ms)
            .into_iter()
            .map(|span| {
                let mut fill = WordFill {
                    text: span.text.to_string(),
                    start_ms: span.start_ms,
                    end_ms: span.end_ms,
                    fraction: WordFill::fraction_at(span.start_ms, span.end_ms, elapsed_ms),
                    gradient: (0.0, 0.0),
                };
                fill.gradient = fill.gradient_stops(self.edge_softness);
                fill
            })
            .collect()
    }

    /// Word fills for entry `index` of a synced document; empty otherwise.
    #[must_use]
    pub fn line_fill(&self, document: &LyricsDocument, index: usize, position_ms: u64) -> Vec<WordFill> {
        if !document.is_synced() {
            return Vec::new();
        }
        document.entry(index).map_or_else(Vec::new, |entry| {
            self.estimate(
                &entry.text,
                entry.time_ms,
                document.next_time_ms(index),
                position_ms,
            )
        })
    }
}

impl From<&KaraokeConfig> for WordTimingEstimator {
    fn from(config: &KaraokeConfig) -> Self {
        Self::new(config.lead_ms, config.compression_ms, config.last_line_ms)
            .with_edge_softness(config.edge_softness)
    }
}

impl Default for WordTimingEstimator {
    fn default() -> Self {
        Self::from(&KaraokeConfig::default())
    }
}
