//! Background romanization of Japanese and Korean lyric lines.
//!
//! Each qualifying line gets its own task. Tasks share a semaphore, never
//! hold engine locks, and only commit while their document is still current.

mod hangul;
mod kana;

pub use hangul::romanize_hangul;
pub use kana::romanize_kana;

use crate::config::RomanizationConfig;
use crate::document::{DocumentGuard, LyricsDocument};
use crate::error::CoreError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

const LOG_TARGET: &str = "lyricsync::romanize";

/// Writing system a line is romanized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Japanese,
    Korean,
}

impl Script {
    /// Only the kana and precomposed syllables the built-in tables cover.
    const fn of_char(c: char) -> Option<Self> {
        match c {
            '\u{3041}'..='\u{3096}' | '\u{30A1}'..='\u{30F6}' => Some(Self::Japanese),
            '\u{AC00}'..='\u{D7A3}' => Some(Self::Korean),
            _ => None,
        }
    }
}

/// Script of `text`, decided by its first kana or Hangul character.
///
/// Han ideographs alone are ambiguous between Chinese and Japanese, so
/// kanji-only text is not classified.
#[must_use]
pub fn classify(text: &str) -> Option<Script> {
    text.chars().find_map(Script::of_char)
}

/// Turns a line of text into Latin script.
#[async_trait]
pub trait Transliterator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Romanize `text`, already classified as `script`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TransliterationFailed`] when the text cannot be
    /// romanized.
    async fn romanize(&self, text: &str, script: Script) -> Result<String, CoreError>;
}

/// Table-driven romanizer: Hepburn for kana, Revised Romanization for Hangul.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTransliterator;

#[async_trait]
impl Transliterator for BuiltinTransliterator {
    fn name(&self) -> &'static str {
        "builtin"
    }

    async fn romanize(&self, text: &str, script: Script) -> Result<String, CoreError> {
        let romanized = match script {
            Script::Japanese => romanize_kana(text),
            Script::Korean => romanize_hangul(text),
        };
        let reason = if romanized.trim().is_empty() {
            "empty result"
        } else if romanized == text {
            "nothing to romanize"
        } else {
            return Ok(romanized);
        };
        Err(CoreError::TransliterationFailed {
            transliterator: self.name().to_string(),
            reason: reason.to_string(),
        })
    }
}

/// How a single line's task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationOutcome {
    Filled,
    /// Another task, or an earlier pass, got there first
    AlreadyFilled,
    /// The document was replaced while the task ran
    Stale,
    Failed,
}

/// Handles for the tasks spawned by one [`RomanizationAnnotator::annotate`] call.
#[derive(Debug, Default)]
pub struct AnnotationBatch {
    handles: Vec<JoinHandle<AnnotationOutcome>>,
}

impl AnnotationBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every task. A task that panicked or was aborted counts as failed.
    pub async fn join(self) -> Vec<AnnotationOutcome> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            outcomes.push(handle.await.unwrap_or(AnnotationOutcome::Failed));
        }
        outcomes
    }

    /// Stop waiting on the tasks. They keep running and still honor the guard.
    pub fn detach(self) {
        drop(self.handles);
    }
}

pub struct RomanizationAnnotator {
    transliterator: Arc<dyn Transliterator>,
    guard: DocumentGuard,
    permits: Arc<Semaphore>,
    config: RomanizationConfig,
}

impl RomanizationAnnotator {
    #[must_use]
    pub fn new(
        transliterator: Arc<dyn Transliterator>,
        guard: DocumentGuard,
        config: RomanizationConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            transliterator,
            guard,
            permits,
            config,
        }
    }

    /// Script `text` would be romanized from, honoring the per-language switches.
    #[must_use]
    pub fn qualifies(&self, text: &str) -> Option<Script> {
        if !self.config.enabled {
            return None;
        }
        classify(text).filter(|script| match script {
            Script::Japanese => self.config.japanese,
            Script::Korean => self.config.korean,
        })
    }

    /// Spawn a romanization task for every qualifying line of `document`
    /// that has no romanization yet. Must be called inside a tokio runtime.
    pub fn annotate(&self, document: &Arc<LyricsDocument>) -> AnnotationBatch {
        let mut handles = Vec::new();

        for (index, entry) in document.entries().iter().enumerate() {
            if entry.romanized.is_filled() {
                continue;
            }
            let Some(script) = self.qualifies(&entry.text) else {
                continue;
            };

            let document = Arc::clone(document);
            let transliterator = Arc::clone(&self.transliterator);
            let guard = self.guard.clone();
            let permits = Arc::clone(&self.permits);

            handles.push(tokio::spawn(async move {
                romanize_entry(&document, index, script, &*transliterator, &guard, &permits).await
            }));
        }

        if !handles.is_empty() {
            debug!(
                target: LOG_TARGET,
                "Romanizing {} line(s) of {}",
                handles.len(),
                document.id()
            );
        }

        AnnotationBatch { handles }
    }
}

async fn romanize_entry(
    document: &LyricsDocument,
    index: usize,
    script: Script,
    transliterator: &dyn Transliterator,
    guard: &DocumentGuard,
    permits: &Semaphore,
) -> AnnotationOutcome {
    let Ok(_permit) = permits.acquire().await else {
        return AnnotationOutcome::Failed;
    };

    if !guard.is_current(document.id()) {
        return AnnotationOutcome::Stale;
    }
    let Some(entry) = document.entry(index) else {
        return AnnotationOutcome::Failed;
    };
    if entry.romanized.is_filled() {
        return AnnotationOutcome::AlreadyFilled;
    }

    let romanized = match transliterator.romanize(&entry.text, script).await {
        Ok(romanized) => romanized,
        Err(e) => {
            debug!(
                target: LOG_TARGET,
                "Romanization of line {index} in {} failed: {e}",
                document.id()
            );
            return AnnotationOutcome::Failed;
        }
    };

    // The document may have been replaced while the transliterator ran. A swap
    // after this check can still fill the old slot, which nothing reads anymore.
    if !guard.is_current(document.id()) {
        trace!(target: LOG_TARGET, "Discarding stale romanization for {}", document.id());
        return AnnotationOutcome::Stale;
    }

    if entry.romanized.fill(romanized) {
        AnnotationOutcome::Filled
    } else {
        AnnotationOutcome::AlreadyFilled
    }
}
