//! Maps a playback position to the active line of a document.

use crate::document::LyricsDocument;

/// Resolve the active line for `position_ms`.
///
/// The line becomes active `lookahead_ms` before its timestamp to absorb the
/// latency of switching lines on screen. Returns `None` for unsynced or empty
/// documents and before the first line. For non-decreasing positions the result
/// never decreases (`None` orders below every `Some`).
#[must_use]
pub fn resolve(document: &LyricsDocument, position_ms: u64, lookahead_ms: u64) -> Option<usize> {
    if !document.is_synced() || document.is_empty() {
        return None;
    }

    let target = position_ms.saturating_add(lookahead_ms);
    // Entries are sorted, so the active line sits just before the first entry past the target
    let past = document
        .entries()
        .partition_point(|entry| entry.time_ms <= target);

    past.checked_sub(1)
}

/// Active line of an unsynced document on the plain-text rotation path.
///
/// Advances once every `interval_ms` of wall time regardless of playback
/// position, cycling back to the first line after the last.
#[must_use]
pub fn rotating_index(len: usize, elapsed_ms: u64, interval_ms: u64) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let steps = elapsed_ms / interval_ms.max(1);
    let len = u64::try_from(len).unwrap_or(u64::MAX);
    usize::try_from(steps % len).ok()
}

/// Line indices a view tracks across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverState {
    /// Line active this tick
    pub current: Option<usize>,
    /// Value `current` held before its last change
    pub previous: Option<usize>,
    /// Last confirmed line, frozen while previewing or selecting
    pub deferred: Option<usize>,
}

impl ResolverState {
    /// Record this tick's resolved line. `frozen` keeps `deferred` where it is.
    ///
    /// Returns `true` when the current line changed.
    pub fn advance(&mut self, resolved: Option<usize>, frozen: bool) -> bool {
        let changed = resolved != self.current;
        if changed {
            self.previous = self.current;
            self.current = resolved;
        }
        if !frozen {
            self.deferred = self.current;
        }
        changed
    }
}
