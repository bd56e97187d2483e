//! Parsed lyrics documents and their write-once romanization slots.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Process-wide source of document identities.
static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a loaded lyrics document.
///
/// Every parse produces a fresh id, so two documents built from the same text
/// are still distinguishable. Background work compares ids to detect that its
/// document was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Sentinel for "no document loaded". Never handed out by [`DocumentId::next`].
    pub const NONE: Self = Self(0);

    pub(crate) fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Shared record of which document a view currently shows.
///
/// The engine owns one guard and hands clones to transliteration tasks; a task
/// commits its result only while its document is still current.
#[derive(Debug, Clone, Default)]
pub struct DocumentGuard {
    current: Arc<AtomicU64>,
}

impl DocumentGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as the current document.
    pub fn replace(&self, id: DocumentId) {
        self.current.store(id.0, Ordering::Release);
    }

    #[must_use]
    pub fn current(&self) -> DocumentId {
        DocumentId(self.current.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_current(&self, id: DocumentId) -> bool {
        self.current() == id
    }
}

/// Single-slot, write-once holder for an entry's romanized text.
///
/// Readers observe either nothing or the complete string, never a partial write.
#[derive(Debug, Clone, Default)]
pub struct RomanizedSlot(OnceLock<String>);

impl RomanizedSlot {
    /// Store the romanization. Returns `false` when the slot was already filled,
    /// in which case the existing value is kept.
    pub fn fill(&self, text: String) -> bool {
        self.0.set(text).is_ok()
    }

    #[must_use]
    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.0.get().is_some()
    }
}

/// A single line of lyrics
#[derive(Debug, Clone)]
pub struct LyricsEntry {
    /// Start time in milliseconds. Synthetic (`index * 100`) for unsynced documents.
    pub time_ms: u64,
    pub text: String,
    pub romanized: RomanizedSlot,
}

impl LyricsEntry {
    pub fn new(time_ms: u64, text: impl Into<String>) -> Self {
        Self {
            time_ms,
            text: text.into(),
            romanized: RomanizedSlot::default(),
        }
    }

    /// Number of embedded line breaks, used for wrapped-line scroll compensation.
    #[must_use]
    pub fn line_breaks(&self) -> usize {
        self.text.matches('\n').count()
    }
}

/// Metadata from LRC ID tags (`[ar:...]`, `[offset:...]`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricsMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub author: Option<String>,
    /// Creator of the LRC file (`by` tag)
    pub creator: Option<String>,
    pub length_ms: Option<u64>,
    /// Milliseconds, already applied to every entry
    pub offset_ms: i64,
}

/// Parsed lyrics for one payload.
///
/// Immutable after parsing apart from the romanization slots.
#[derive(Debug, Clone)]
pub struct LyricsDocument {
    id: DocumentId,
    entries: Vec<LyricsEntry>,
    is_synced: bool,
    metadata: LyricsMetadata,
}

impl LyricsDocument {
    pub(crate) fn new(entries: Vec<LyricsEntry>, is_synced: bool, metadata: LyricsMetadata) -> Self {
        Self {
            id: DocumentId::next(),
            entries,
            is_synced,
            metadata,
        }
    }

    /// Build a synced document from pre-timed entries (e.g. a provider that
    /// returns structured lines). Entries are stable-sorted by time.
    #[must_use]
    pub fn from_entries(mut entries: Vec<LyricsEntry>, metadata: LyricsMetadata) -> Self {
        entries.sort_by_key(|entry| entry.time_ms);
        Self::new(entries, true, metadata)
    }

    #[must_use]
    pub const fn id(&self) -> DocumentId {
        self.id
    }

    #[must_use]
    pub fn entries(&self) -> &[LyricsEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&LyricsEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.is_synced
    }

    #[must_use]
    pub const fn metadata(&self) -> &LyricsMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start time of the entry after `index`, if any.
    #[must_use]
    pub fn next_time_ms(&self, index: usize) -> Option<u64> {
        self.entries.get(index + 1).map(|entry| entry.time_ms)
    }

    /// Plain text of the whole document, one entry per line.
    #[must_use]
    pub fn text(&self) -> String {
        self.entries
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
