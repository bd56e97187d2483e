use crate::config::LyricsyncConfig;
use crate::document::{DocumentGuard, DocumentId, LyricsDocument};
use crate::karaoke::{WordFill, WordTimingEstimator};
use crate::parser::{parse_payload, LyricsStatus};
use crate::playback::{PlaybackControl, PlaybackSample};
use crate::provider::LyricsPayload;
use crate::resolver::{resolve, rotating_index, ResolverState};
use crate::romanize::{RomanizationAnnotator, Transliterator};
use crate::scroll::{ScrollAnimation, ScrollAnimator, ScrollCoordinator, ScrollInput, Viewport};
use crate::selection::{SelectionOutcome, SelectionState};
use crate::time::DurationExt;
use crate::tracker::{PreviewTracker, TrackerState};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LOG_TARGET: &str = "lyricsync::engine";
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything a renderer needs to draw one tick.
#[derive(Debug, Clone, Serialize)]
pub struct LyricsFrame {
    pub document_id: DocumentId,
    pub synced: bool,
    /// Line active at the resolved position
    pub current_line: Option<usize>,
    /// Line to highlight; frozen while previewing or selecting
    pub deferred_line: Option<usize>,
    pub tracker_state: TrackerState,
    /// Word fills of the highlighted line, empty for unsynced documents
    pub words: Vec<WordFill>,
    pub scroll: Option<ScrollAnimation>,
    /// Selected lines while selection mode is on
    pub selected: Vec<usize>,
}

/// Events emitted by the sync engine
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A new document replaced the previous one
    LyricsLoaded { document: Arc<LyricsDocument> },
    /// The source confirmed there are no lyrics for the track
    LyricsNotFound,
    /// Lyrics were unloaded, e.g. while the next lookup is in flight
    LyricsCleared,
    /// Result of one polling tick
    Frame(LyricsFrame),
    /// A selection toggle was rejected because the selection is full
    SelectionLimitReached { limit: usize },
}

/// Per-document state. Replaced as a whole when a new payload is loaded.
struct SyncEngineInner {
    status: LyricsStatus,
    lines: ResolverState,
    tracker: PreviewTracker,
    scroll: ScrollCoordinator,
    animator: ScrollAnimator,
    selection: Option<SelectionState>,
    /// Selection mode ended; the next tick scrolls back to the active line
    selection_released: bool,
    /// Tick time the unsynced rotation counts from
    rotation_origin_ms: Option<u64>,
}

impl SyncEngineInner {
    fn new(config: &LyricsyncConfig) -> Self {
        Self {
            status: LyricsStatus::NotLoaded,
            lines: ResolverState::default(),
            tracker: PreviewTracker::new(config.sync.preview_cooldown_ms),
            scroll: ScrollCoordinator::new(config.scroll.clone()),
            animator: ScrollAnimator::new(),
            selection: None,
            selection_released: false,
            rotation_origin_ms: None,
        }
    }

    fn document(&self) -> Option<&Arc<LyricsDocument>> {
        self.status.document()
    }
}

/// Engine that keeps a lyrics view in step with playback
pub struct SyncEngine {
    inner: RwLock<SyncEngineInner>,
    event_tx: broadcast::Sender<SyncEvent>,
    config: LyricsyncConfig,
    estimator: WordTimingEstimator,
    guard: DocumentGuard,
    annotator: RomanizationAnnotator,
}

impl SyncEngine {
    /// Create a new sync engine
    #[must_use]
    pub fn new(config: LyricsyncConfig, transliterator: Arc<dyn Transliterator>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let guard = DocumentGuard::new();
        let annotator =
            RomanizationAnnotator::new(transliterator, guard.clone(), config.romanization.clone());

        Arc::new(Self {
            inner: RwLock::new(SyncEngineInner::new(&config)),
            event_tx,
            estimator: WordTimingEstimator::from(&config.karaoke),
            config,
            guard,
            annotator,
        })
    }

    /// Subscribe to sync events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Replace the current lyrics with `payload`.
    ///
    /// Resets every per-document state together, stops the in-flight scroll,
    /// and starts romanizing the new document in the background. Romanization
    /// still running for the old document is discarded. Must be called inside
    /// a tokio runtime.
    pub async fn load(&self, payload: &LyricsPayload) -> LyricsStatus {
        let status = parse_payload(payload);

        {
            let mut inner = self.inner.write().await;
            inner.animator.cancel();
            *inner = SyncEngineInner::new(&self.config);
            inner.status = status.clone();
            self.guard
                .replace(status.document().map_or(DocumentId::NONE, |doc| doc.id()));
        }

        let event = match &status {
            LyricsStatus::Loaded(document) => {
                info!(
                    target: LOG_TARGET,
                    "Loaded {} with {} line(s) (synced: {})",
                    document.id(),
                    document.len(),
                    document.is_synced()
                );
                self.annotator.annotate(document).detach();
                SyncEvent::LyricsLoaded {
                    document: Arc::clone(document),
                }
            }
            LyricsStatus::NotFound => {
                info!(target: LOG_TARGET, "No lyrics found");
                SyncEvent::LyricsNotFound
            }
            LyricsStatus::NotLoaded => {
                debug!(target: LOG_TARGET, "Lyrics cleared");
                SyncEvent::LyricsCleared
            }
        };
        let _ = self.event_tx.send(event);

        status
    }

    /// Current lyrics status
    pub async fn status(&self) -> LyricsStatus {
        self.inner.read().await.status.clone()
    }

    /// Current document, if one is loaded
    pub async fn document(&self) -> Option<Arc<LyricsDocument>> {
        self.inner.read().await.document().cloned()
    }

    /// Run one polling step for `sample`, taken at `now_ms` on a monotonic clock.
    pub async fn tick(
        &self,
        sample: PlaybackSample,
        viewport: &dyn Viewport,
        now_ms: u64,
    ) -> LyricsFrame {
        let mut state = self.inner.write().await;
        let inner = &mut *state;

        let tracker = inner.tracker.observe(sample, now_ms);
        let frozen = tracker.state != TrackerState::Live || inner.selection.is_some();

        let Some(document) = inner.status.document().cloned() else {
            return self.publish(LyricsFrame {
                document_id: DocumentId::NONE,
                synced: false,
                current_line: None,
                deferred_line: None,
                tracker_state: tracker.state,
                words: Vec::new(),
                scroll: None,
                selected: Vec::new(),
            });
        };

        let mut scroll = None;
        let words;
        if document.is_synced() {
            let resolved = resolve(&document, tracker.position_ms, self.config.sync.lookahead_ms);
            let line_changed = inner.lines.advance(resolved, frozen);
            if line_changed {
                debug!(
                    target: LOG_TARGET,
                    "Line {:?} -> {:?} at {}ms ({:?})",
                    inner.lines.previous,
                    inner.lines.current,
                    tracker.position_ms,
                    tracker.state
                );
            }

            // While selecting, the highlight stays on the line the user saw
            let selecting = inner.selection.is_some();
            let highlighted = if selecting {
                inner.lines.deferred
            } else {
                inner.lines.current
            };
            words = highlighted.map_or_else(Vec::new, |index| {
                self.estimator
                    .line_fill(&document, index, tracker.position_ms)
            });

            // While selecting, only scrubbing moves the view
            if !selecting || tracker.state == TrackerState::Previewing {
                let mut input = ScrollInput {
                    lines: inner.lines,
                    line_changed,
                    tracker,
                };
                input.tracker.resumed_live |= std::mem::take(&mut inner.selection_released);
                if let Some(target) = inner.scroll.decide(&input, &document, viewport) {
                    debug!(target: LOG_TARGET, "Scroll to {target:?}");
                    scroll = Some(inner.animator.start(target));
                }
            }
        } else {
            let origin_ms = *inner.rotation_origin_ms.get_or_insert(now_ms);
            let resolved = rotating_index(
                document.len(),
                now_ms.saturating_sub(origin_ms),
                self.config.sync.unsynced_rotation_ms,
            );
            inner.lines.advance(resolved, frozen);
            words = Vec::new();
        }

        self.publish(LyricsFrame {
            document_id: document.id(),
            synced: document.is_synced(),
            current_line: inner.lines.current,
            deferred_line: inner.lines.deferred,
            tracker_state: tracker.state,
            words,
            scroll,
            selected: inner
                .selection
                .as_ref()
                .map_or_else(Vec::new, |selection| selection.indices().collect()),
        })
    }

    fn publish(&self, frame: LyricsFrame) -> LyricsFrame {
        let _ = self.event_tx.send(SyncEvent::Frame(frame.clone()));
        frame
    }

    /// Poll `control` every `sync.poll_interval_ms` until `cancel` fires.
    ///
    /// Cancelling also stops the in-flight scroll animation.
    pub async fn run(
        self: Arc<Self>,
        control: Arc<dyn PlaybackControl>,
        viewport: Arc<dyn Viewport>,
        cancel: CancellationToken,
    ) {
        info!(
            target: LOG_TARGET,
            "Starting sync loop ({}ms poll interval)",
            self.config.sync.poll_interval_ms
        );

        let started = Instant::now();
        let mut interval = tokio::time::interval(self.config.sync.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(target: LOG_TARGET, "Sync loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let now_ms = started.elapsed().as_millis_u64();
                    self.tick(control.sample(), viewport.as_ref(), now_ms).await;
                }
            }
        }

        self.inner.write().await.animator.cancel();
    }

    /// Enter selection mode. Returns `false` when no document is loaded.
    pub async fn enter_selection(&self) -> bool {
        let mut inner = self.inner.write().await;
        if inner.document().is_none() {
            return false;
        }
        if inner.selection.is_none() {
            inner.selection = Some(SelectionState::new(self.config.selection.limit));
        }
        true
    }

    /// Leave selection mode, returning the lines that were selected.
    ///
    /// The next tick animates back to the active line.
    pub async fn exit_selection(&self) -> Option<SelectionState> {
        let mut inner = self.inner.write().await;
        let selection = inner.selection.take();
        inner.selection_released = selection.is_some();
        selection
    }

    pub async fn is_selecting(&self) -> bool {
        self.inner.read().await.selection.is_some()
    }

    /// Toggle line `index` in the selection.
    ///
    /// Returns `None` outside selection mode or for an index past the end of
    /// the document. A rejected addition emits
    /// [`SyncEvent::SelectionLimitReached`].
    pub async fn toggle_selection(&self, index: usize) -> Option<SelectionOutcome> {
        let mut inner = self.inner.write().await;
        let len = inner.document()?.len();
        if index >= len {
            return None;
        }

        let outcome = inner.selection.as_mut()?.toggle(index);
        if let SelectionOutcome::LimitReached { limit } = outcome {
            debug!(target: LOG_TARGET, "Selection full ({limit} lines), ignoring line {index}");
            let _ = self.event_tx.send(SyncEvent::SelectionLimitReached { limit });
        }
        Some(outcome)
    }

    /// Text of the selected lines in document order, for sharing.
    pub async fn selected_text(&self) -> Option<String> {
        let inner = self.inner.read().await;
        let document = inner.document()?;
        inner
            .selection
            .as_ref()
            .map(|selection| selection.selected_text(document))
    }

    /// Seek the player to the start of line `index`.
    ///
    /// Only synced documents carry real timestamps; returns `false` otherwise
    /// or when `index` is out of range.
    pub async fn seek_to_line(&self, index: usize, control: &dyn PlaybackControl) -> bool {
        let time_ms = {
            let inner = self.inner.read().await;
            let Some(entry) = inner
                .document()
                .filter(|doc| doc.is_synced())
                .and_then(|doc| doc.entry(index))
            else {
                return false;
            };
            entry.time_ms
        };

        debug!(target: LOG_TARGET, "Seeking to line {index} at {time_ms}ms");
        control.seek_to(time_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlaybackClock;
    use crate::romanize::BuiltinTransliterator;
    use crate::scroll::{DetachedViewport, LinePosition};
    use std::collections::HashMap;
    use std::time::Duration;

    const LRC: &str = "[00:10.00]Hello\n[00:15.00]World";

    fn engine() -> Arc<SyncEngine> {
        SyncEngine::new(LyricsyncConfig::default(), Arc::new(BuiltinTransliterator))
    }

    fn raw(text: &str) -> LyricsPayload {
        LyricsPayload::Raw(text.to_string())
    }

    struct FixedViewport(HashMap<usize, f32>);

    impl Viewport for FixedViewport {
        fn height_px(&self) -> f32 {
            1000.0
        }

        fn line_position(&self, index: usize) -> Option<LinePosition> {
            self.0.get(&index).map(|&top_px| LinePosition { top_px })
        }
    }

    #[tokio::test]
    async fn test_load_emits_events() {
        let engine = engine();
        let mut rx = engine.subscribe();

        engine.load(&raw(LRC)).await;
        engine.load(&LyricsPayload::NotFound).await;
        engine.load(&LyricsPayload::NotLoaded).await;

        assert!(matches!(
            rx.recv().await,
            Ok(SyncEvent::LyricsLoaded { document }) if document.len() == 2
        ));
        assert!(matches!(rx.recv().await, Ok(SyncEvent::LyricsNotFound)));
        assert!(matches!(rx.recv().await, Ok(SyncEvent::LyricsCleared)));
        assert!(engine.document().await.is_none());
    }

    #[tokio::test]
    async fn test_tick_resolves_and_fills() {
        let engine = engine();
        engine.load(&raw(LRC)).await;

        let frame = engine
            .tick(PlaybackSample::live(12_000), &DetachedViewport, 0)
            .await;
        assert!(frame.synced);
        assert_eq!(frame.current_line, Some(0));
        assert_eq!(frame.deferred_line, Some(0));
        // 2150ms (lead included) into a 4550ms fill
        assert_eq!(frame.words.len(), 1);
        assert!((0.45..0.5).contains(&frame.words[0].fraction));

        let frame = engine
            .tick(PlaybackSample::live(14_800), &DetachedViewport, 50)
            .await;
        assert_eq!(frame.current_line, Some(1));
    }

    #[tokio::test]
    async fn test_frame_json_shape() {
        let engine = engine();
        engine.load(&raw(LRC)).await;
        let frame = engine
            .tick(PlaybackSample::live(10_000), &DetachedViewport, 0)
            .await;

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["current_line"], 0);
        assert_eq!(json["tracker_state"], "live");
        assert_eq!(json["words"][0]["text"], "Hello");
        assert_eq!(
            json["scroll"],
            serde_json::json!({ "index": 0, "pixel_offset": 0, "animated": false })
        );
    }

    #[tokio::test]
    async fn test_tick_without_document() {
        let engine = engine();
        let frame = engine
            .tick(PlaybackSample::live(5_000), &DetachedViewport, 0)
            .await;
        assert_eq!(frame.document_id, DocumentId::NONE);
        assert_eq!(frame.current_line, None);
        assert!(frame.scroll.is_none());
    }

    #[tokio::test]
    async fn test_first_scroll_jumps_then_follows() {
        let engine = engine();
        engine.load(&raw(LRC)).await;
        let viewport = FixedViewport(HashMap::from([(0, 400.0), (1, 480.0)]));

        let first = engine
            .tick(PlaybackSample::live(10_000), &viewport, 0)
            .await;
        let first = first.scroll.map(|s| (s.target.index, s.target.animated));
        assert_eq!(first, Some((0, false)));

        let same_line = engine
            .tick(PlaybackSample::live(11_000), &viewport, 50)
            .await;
        assert!(same_line.scroll.is_none());

        let next = engine
            .tick(PlaybackSample::live(15_000), &viewport, 100)
            .await;
        let next = next.scroll.map(|s| (s.target.index, s.target.animated));
        assert_eq!(next, Some((1, true)));
    }

    #[tokio::test]
    async fn test_new_scroll_cancels_previous() {
        let engine = engine();
        engine.load(&raw(LRC)).await;

        let mut preview = PlaybackSample::live(10_000).with_preview(10_000);
        let first = engine.tick(preview, &DetachedViewport, 0).await.scroll;
        preview.preview_position_ms = Some(15_000);
        let second = engine.tick(preview, &DetachedViewport, 50).await.scroll;

        assert!(first.is_some_and(|s| s.is_cancelled()));
        assert!(second.is_some_and(|s| !s.is_cancelled()));
    }

    #[tokio::test]
    async fn test_preview_freezes_deferred_line() {
        let engine = engine();
        engine.load(&raw(LRC)).await;
        engine
            .tick(PlaybackSample::live(11_000), &DetachedViewport, 0)
            .await;

        let frame = engine
            .tick(
                PlaybackSample::live(11_050).with_preview(16_000),
                &DetachedViewport,
                50,
            )
            .await;
        assert_eq!(frame.tracker_state, TrackerState::Previewing);
        assert_eq!(frame.current_line, Some(1));
        assert_eq!(frame.deferred_line, Some(0));

        // Cooldown still holds the previewed position
        let frame = engine
            .tick(PlaybackSample::live(11_100), &DetachedViewport, 100)
            .await;
        assert_eq!(frame.tracker_state, TrackerState::PreviewCooldown);
        assert_eq!(frame.deferred_line, Some(0));

        let frame = engine
            .tick(PlaybackSample::live(16_100), &DetachedViewport, 2_200)
            .await;
        assert_eq!(frame.tracker_state, TrackerState::Live);
        assert_eq!(frame.deferred_line, Some(1));
        // Back to live: one animated scroll to the playing line
        assert_eq!(
            frame.scroll.map(|s| (s.target.index, s.target.animated)),
            Some((1, true))
        );

        let frame = engine
            .tick(PlaybackSample::live(16_150), &DetachedViewport, 2_250)
            .await;
        assert!(frame.scroll.is_none());
    }

    #[tokio::test]
    async fn test_unsynced_rotation() {
        let engine = engine();
        engine.load(&raw("one\ntwo\nthree")).await;

        let mut seen = Vec::new();
        for now_ms in [1_000, 3_999, 4_000, 7_000, 10_000] {
            let frame = engine
                .tick(PlaybackSample::live(0), &DetachedViewport, now_ms)
                .await;
            assert!(!frame.synced);
            assert!(frame.words.is_empty());
            assert!(frame.scroll.is_none());
            seen.push(frame.current_line);
        }
        assert_eq!(seen, vec![Some(0), Some(0), Some(1), Some(2), Some(0)]);
    }

    #[tokio::test]
    async fn test_selection_limit_emits_once() {
        let engine = engine();
        engine
            .load(&raw("a\nb\nc\nd\ne\nf\ng"))
            .await;
        assert_eq!(engine.toggle_selection(0).await, None);
        assert!(engine.enter_selection().await);

        for index in 0..5 {
            assert_eq!(
                engine.toggle_selection(index).await,
                Some(SelectionOutcome::Added)
            );
        }
        let mut rx = engine.subscribe();
        assert_eq!(
            engine.toggle_selection(5).await,
            Some(SelectionOutcome::LimitReached { limit: 5 })
        );
        assert!(matches!(
            rx.try_recv(),
            Ok(SyncEvent::SelectionLimitReached { limit: 5 })
        ));
        assert!(rx.try_recv().is_err());

        assert_eq!(engine.toggle_selection(99).await, None);
        assert_eq!(engine.selected_text().await.as_deref(), Some("a\nb\nc\nd\ne"));

        let selection = engine.exit_selection().await;
        assert_eq!(selection.map(|s| s.len()), Some(5));
        assert!(!engine.is_selecting().await);
    }

    #[tokio::test]
    async fn test_selection_freezes_deferred_and_resets_on_load() {
        let engine = engine();
        engine.load(&raw(LRC)).await;
        engine
            .tick(PlaybackSample::live(11_000), &DetachedViewport, 0)
            .await;
        engine.enter_selection().await;

        let frame = engine
            .tick(PlaybackSample::live(15_000), &DetachedViewport, 50)
            .await;
        assert_eq!(frame.current_line, Some(1));
        assert_eq!(frame.deferred_line, Some(0));

        engine.load(&raw(LRC)).await;
        assert!(!engine.is_selecting().await);
        let frame = engine
            .tick(PlaybackSample::live(15_000), &DetachedViewport, 100)
            .await;
        assert_eq!(frame.deferred_line, Some(1));
        // Fresh document, so the first scroll jumps again
        assert_eq!(frame.scroll.map(|s| s.target.animated), Some(false));
    }

    #[tokio::test]
    async fn test_selection_holds_scroll_and_fill() {
        let engine = engine();
        engine.load(&raw(LRC)).await;
        let only_first = FixedViewport(HashMap::from([(0, 400.0)]));
        engine
            .tick(PlaybackSample::live(11_000), &only_first, 0)
            .await;
        engine.enter_selection().await;

        // Line 1 is active and off screen, which would normally animate
        let frame = engine
            .tick(PlaybackSample::live(15_000), &only_first, 50)
            .await;
        assert_eq!(frame.current_line, Some(1));
        assert_eq!(frame.deferred_line, Some(0));
        assert!(frame.scroll.is_none());
        let words: Vec<&str> = frame.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(words, vec!["Hello"]);

        // Scrubbing while selecting still jumps to the previewed line
        let frame = engine
            .tick(
                PlaybackSample::live(15_050).with_preview(10_500),
                &only_first,
                100,
            )
            .await;
        assert_eq!(frame.tracker_state, TrackerState::Previewing);
        assert_eq!(
            frame.scroll.map(|s| (s.target.index, s.target.animated)),
            Some((0, false))
        );
    }

    #[tokio::test]
    async fn test_exit_selection_animates_back() {
        let engine = engine();
        engine.load(&raw(LRC)).await;
        let viewport = FixedViewport(HashMap::from([(0, 400.0), (1, 480.0)]));
        engine
            .tick(PlaybackSample::live(11_000), &viewport, 0)
            .await;
        engine.enter_selection().await;
        let frame = engine
            .tick(PlaybackSample::live(15_000), &viewport, 50)
            .await;
        assert!(frame.scroll.is_none());

        assert!(engine.exit_selection().await.is_some());
        let frame = engine
            .tick(PlaybackSample::live(15_050), &viewport, 100)
            .await;
        assert_eq!(frame.deferred_line, Some(1));
        assert_eq!(frame.words[0].text, "World");
        assert_eq!(
            frame.scroll.map(|s| (s.target.index, s.target.animated)),
            Some((1, true))
        );

        let frame = engine
            .tick(PlaybackSample::live(15_100), &viewport, 150)
            .await;
        assert!(frame.scroll.is_none());
    }

    #[tokio::test]
    async fn test_load_cancels_in_flight_scroll() {
        let engine = engine();
        engine.load(&raw(LRC)).await;
        let scroll = engine
            .tick(PlaybackSample::live(11_000), &DetachedViewport, 0)
            .await
            .scroll;
        engine.load(&LyricsPayload::NotFound).await;
        assert!(scroll.is_some_and(|s| s.is_cancelled()));
    }

    #[tokio::test]
    async fn test_seek_to_line() {
        let engine = engine();
        let clock = PlaybackClock::new(Duration::ZERO, Duration::from_secs(60));

        assert!(!engine.seek_to_line(0, &clock).await);
        engine.load(&raw(LRC)).await;
        assert!(engine.seek_to_line(1, &clock).await);
        assert_eq!(clock.position(), Duration::from_secs(15));
        assert!(!engine.seek_to_line(2, &clock).await);

        engine.load(&raw("plain\ntext")).await;
        assert!(!engine.seek_to_line(1, &clock).await);
    }

    #[tokio::test]
    async fn test_load_romanizes_in_background() {
        let engine = engine();
        let status = engine.load(&raw("[00:01.00]さくら\n[00:02.00]사랑해")).await;
        let document = status.document().cloned().unwrap();

        for _ in 0..100 {
            if document.entries().iter().all(|e| e.romanized.is_filled()) {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(document.entries()[0].romanized.get(), Some("sakura"));
        assert_eq!(document.entries()[1].romanized.get(), Some("saranghae"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_until_cancelled() {
        let engine = engine();
        engine.load(&raw(LRC)).await;
        let mut rx = engine.subscribe();

        let clock = Arc::new(PlaybackClock::new(
            Duration::from_secs(11),
            Duration::from_secs(60),
        ));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&engine).run(
            clock,
            Arc::new(DetachedViewport),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(175)).await;
        cancel.cancel();
        assert!(handle.await.is_ok());

        let mut frames = 0;
        let mut last_scroll = None;
        while let Ok(event) = rx.try_recv() {
            if let SyncEvent::Frame(frame) = event {
                frames += 1;
                assert_eq!(frame.current_line, Some(0));
                if frame.scroll.is_some() {
                    last_scroll = frame.scroll;
                }
            }
        }
        // Ticks at 0, 50, 100 and 150ms
        assert_eq!(frames, 4);
        assert!(last_scroll.is_some_and(|s| s.is_cancelled()));
    }
}
