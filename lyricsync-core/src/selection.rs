//! Bounded multi-line selection used for sharing lyrics.

use crate::document::LyricsDocument;
use std::collections::BTreeSet;

/// Result of toggling a line in the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Added,
    Removed,
    /// The selection is full; nothing changed
    LimitReached { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<usize>,
    limit: usize,
}

impl SelectionState {
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            selected: BTreeSet::new(),
            limit,
        }
    }

    /// Add `index` if absent, remove it if present.
    pub fn toggle(&mut self, index: usize) -> SelectionOutcome {
        if self.selected.remove(&index) {
            return SelectionOutcome::Removed;
        }
        self.insert(index)
    }

    /// Add `index`. Selecting an already selected line is not a rejection.
    pub fn insert(&mut self, index: usize) -> SelectionOutcome {
        if self.selected.contains(&index) {
            return SelectionOutcome::Added;
        }
        if self.selected.len() >= self.limit {
            return SelectionOutcome::LimitReached { limit: self.limit };
        }
        self.selected.insert(index);
        SelectionOutcome::Added
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Selected indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Selected lines joined in document order. Indices past the end are skipped.
    #[must_use]
    pub fn selected_text(&self, document: &LyricsDocument) -> String {
        self.indices()
            .filter_map(|index| document.entry(index))
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
