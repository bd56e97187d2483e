//! Scroll decisions for the lyrics list.
//!
//! The coordinator decides, once per tick, whether the view should stay put,
//! jump, or animate to the active line. The animator makes sure only one
//! animation is ever in flight.

use crate::config::ScrollConfig;
use crate::document::LyricsDocument;
use crate::resolver::ResolverState;
use crate::tracker::{TrackerState, TrackerTick};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Where a rendered line currently sits in the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePosition {
    /// Offset of the line's top edge from the viewport's top edge
    pub top_px: f32,
}

/// Read-only view of the renderer's layout.
pub trait Viewport: Send + Sync {
    fn height_px(&self) -> f32;

    /// Position of line `index`, or `None` when it is not visible.
    fn line_position(&self, index: usize) -> Option<LinePosition>;
}

/// Viewport used before a renderer is attached: nothing is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedViewport;

impl Viewport for DetachedViewport {
    fn height_px(&self) -> f32 {
        0.0
    }

    fn line_position(&self, _index: usize) -> Option<LinePosition> {
        None
    }
}

/// Scroll request for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollTarget {
    pub index: usize,
    /// Extra offset compensating for line breaks inside the target line
    pub pixel_offset: i32,
    pub animated: bool,
}

/// Inputs for one scroll decision.
#[derive(Debug, Clone, Copy)]
pub struct ScrollInput {
    pub lines: ResolverState,
    /// The current line differs from the previous tick
    pub line_changed: bool,
    pub tracker: TrackerTick,
}

#[derive(Debug, Clone)]
pub struct ScrollCoordinator {
    config: ScrollConfig,
    has_scrolled: bool,
}

impl ScrollCoordinator {
    #[must_use]
    pub const fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            has_scrolled: false,
        }
    }

    /// Forget the first-scroll state, e.g. when a new document is loaded.
    pub fn reset(&mut self) {
        self.has_scrolled = false;
    }

    /// Decide this tick's scroll. Returns at most one target.
    pub fn decide(
        &mut self,
        input: &ScrollInput,
        document: &LyricsDocument,
        viewport: &dyn Viewport,
    ) -> Option<ScrollTarget> {
        let current = input.lines.current?;
        let pixel_offset = self.pixel_offset(document, current);
        let target = |animated| ScrollTarget {
            index: current,
            pixel_offset,
            animated,
        };

        if !self.has_scrolled {
            self.has_scrolled = true;
            return Some(target(false));
        }

        if input.tracker.state == TrackerState::Previewing {
            return Some(target(false));
        }

        if input.tracker.left_preview || input.tracker.resumed_live {
            return Some(target(true));
        }

        if !input.line_changed {
            return None;
        }

        let Some(current_position) = viewport.line_position(current) else {
            return Some(target(true));
        };

        let previous_position = input
            .lines
            .previous
            .and_then(|previous| viewport.line_position(previous))?;

        let height = viewport.height_px();
        if self.in_band(current_position, height) && self.in_band(previous_position, height) {
            Some(target(true))
        } else {
            None
        }
    }

    fn in_band(&self, position: LinePosition, height_px: f32) -> bool {
        if height_px <= 0.0 {
            return false;
        }
        let fraction = position.top_px / height_px;
        fraction >= self.config.band_start && fraction <= self.config.band_end
    }

    fn pixel_offset(&self, document: &LyricsDocument, index: usize) -> i32 {
        let breaks = document
            .entry(index)
            .map_or(0, crate::document::LyricsEntry::line_breaks);
        i32::try_from(breaks)
            .unwrap_or(i32::MAX)
            .saturating_mul(self.config.line_break_offset_px)
    }
}

/// A scroll the renderer is performing. Stops when cancelled.
#[derive(Debug, Clone, Serialize)]
pub struct ScrollAnimation {
    #[serde(flatten)]
    pub target: ScrollTarget,
    #[serde(skip)]
    token: CancellationToken,
}

impl ScrollAnimation {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when a newer target replaces this one or the view is torn down.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// Holds the single in-flight scroll animation.
#[derive(Debug, Default)]
pub struct ScrollAnimator {
    current: Option<CancellationToken>,
}

impl ScrollAnimator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a scroll to `target`, stopping the previous one first.
    pub fn start(&mut self, target: ScrollTarget) -> ScrollAnimation {
        self.cancel();
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        ScrollAnimation { target, token }
    }

    /// Stop the in-flight animation, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::collections::HashMap;

    struct FakeViewport {
        height: f32,
        lines: HashMap<usize, f32>,
    }

    impl FakeViewport {
        fn new(height: f32, lines: &[(usize, f32)]) -> Self {
            Self {
                height,
                lines: lines.iter().copied().collect(),
            }
        }
    }

    impl Viewport for FakeViewport {
        fn height_px(&self) -> f32 {
            self.height
        }

        fn line_position(&self, index: usize) -> Option<LinePosition> {
            self.lines.get(&index).map(|&top_px| LinePosition { top_px })
        }
    }

    fn live_tick() -> TrackerTick {
        TrackerTick {
            state: TrackerState::Live,
            position_ms: 0,
            left_preview: false,
            resumed_live: false,
        }
    }

    fn input(current: usize, previous: Option<usize>, line_changed: bool) -> ScrollInput {
        ScrollInput {
            lines: ResolverState {
                current: Some(current),
                previous,
                deferred: Some(current),
            },
            line_changed,
            tracker: live_tick(),
        }
    }

    fn coordinator_after_first_scroll(doc: &LyricsDocument) -> ScrollCoordinator {
        let mut coordinator = ScrollCoordinator::new(ScrollConfig::default());
        let first = coordinator.decide(&input(0, None, true), doc, &DetachedViewport);
        assert_eq!(first.map(|t| t.animated), Some(false));
        coordinator
    }

    fn doc() -> LyricsDocument {
        parse("[00:01.00]a\n[00:02.00]b\n[00:03.00]c\n[00:04.00]d")
    }

    #[test]
    fn test_first_resolution_jumps() {
        let doc = doc();
        let mut coordinator = ScrollCoordinator::new(ScrollConfig::default());
        let target = coordinator.decide(&input(2, None, true), &doc, &DetachedViewport);
        assert_eq!(
            target,
            Some(ScrollTarget {
                index: 2,
                pixel_offset: 0,
                animated: false
            })
        );
    }

    #[test]
    fn test_nothing_active_never_scrolls() {
        let doc = doc();
        let mut coordinator = ScrollCoordinator::new(ScrollConfig::default());
        let mut nothing = input(0, None, false);
        nothing.lines.current = None;
        assert_eq!(coordinator.decide(&nothing, &doc, &DetachedViewport), None);
        // The first real resolution still jumps
        assert_eq!(
            coordinator
                .decide(&input(0, None, true), &doc, &DetachedViewport)
                .map(|t| t.animated),
            Some(false)
        );
    }

    #[test]
    fn test_previewing_jumps_every_tick() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        let mut previewing = input(3, Some(0), false);
        previewing.tracker.state = TrackerState::Previewing;
        for _ in 0..3 {
            let target = coordinator.decide(&previewing, &doc, &DetachedViewport);
            assert_eq!(target.map(|t| (t.index, t.animated)), Some((3, false)));
        }
    }

    #[test]
    fn test_leaving_preview_animates() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        let mut released = input(1, Some(3), false);
        released.tracker.state = TrackerState::PreviewCooldown;
        released.tracker.left_preview = true;
        let target = coordinator.decide(&released, &doc, &DetachedViewport);
        assert_eq!(target.map(|t| t.animated), Some(true));
    }

    #[test]
    fn test_cooldown_expiry_animates_once() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        let viewport = FakeViewport::new(1000.0, &[(0, 820.0), (2, 900.0)]);

        // Both lines sit outside the band, so only the resume itself scrolls
        let mut resumed = input(2, Some(0), false);
        resumed.tracker.resumed_live = true;
        let target = coordinator.decide(&resumed, &doc, &viewport);
        assert_eq!(target.map(|t| (t.index, t.animated)), Some((2, true)));

        resumed.tracker.resumed_live = false;
        assert_eq!(coordinator.decide(&resumed, &doc, &viewport), None);
    }

    #[test]
    fn test_invisible_current_line_animates() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        let viewport = FakeViewport::new(1000.0, &[(0, 400.0)]);
        let target = coordinator.decide(&input(1, Some(0), true), &doc, &viewport);
        assert_eq!(target.map(|t| (t.index, t.animated)), Some((1, true)));
    }

    #[test]
    fn test_both_in_band_animates() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        let viewport = FakeViewport::new(1000.0, &[(0, 380.0), (1, 460.0)]);
        let target = coordinator.decide(&input(1, Some(0), true), &doc, &viewport);
        assert_eq!(target.map(|t| t.animated), Some(true));
    }

    #[test]
    fn test_line_near_edge_does_not_scroll() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        let viewport = FakeViewport::new(1000.0, &[(0, 820.0), (1, 900.0)]);
        assert_eq!(
            coordinator.decide(&input(1, Some(0), true), &doc, &viewport),
            None
        );
    }

    #[test]
    fn test_only_one_line_in_band_does_not_scroll() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        let viewport = FakeViewport::new(1000.0, &[(0, 450.0), (1, 560.0)]);
        assert_eq!(
            coordinator.decide(&input(1, Some(0), true), &doc, &viewport),
            None
        );
    }

    #[test]
    fn test_previous_line_hidden_does_not_scroll() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        let viewport = FakeViewport::new(1000.0, &[(2, 450.0)]);
        assert_eq!(
            coordinator.decide(&input(2, Some(1), true), &doc, &viewport),
            None
        );
    }

    #[test]
    fn test_unchanged_line_does_not_scroll() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        assert_eq!(
            coordinator.decide(&input(1, Some(0), false), &doc, &DetachedViewport),
            None
        );
    }

    #[test]
    fn test_reset_restores_first_jump() {
        let doc = doc();
        let mut coordinator = coordinator_after_first_scroll(&doc);
        coordinator.reset();
        let target = coordinator.decide(&input(1, Some(0), false), &doc, &DetachedViewport);
        assert_eq!(target.map(|t| t.animated), Some(false));
    }

    #[test]
    fn test_offset_for_wrapped_lines() {
        let doc = LyricsDocument::from_entries(
            vec![
                crate::document::LyricsEntry::new(0, "one"),
                crate::document::LyricsEntry::new(1000, "two\nlines\nhere"),
            ],
            crate::document::LyricsMetadata::default(),
        );
        let mut coordinator = ScrollCoordinator::new(ScrollConfig::default());
        let target = coordinator.decide(&input(1, None, true), &doc, &DetachedViewport);
        assert_eq!(target.map(|t| t.pixel_offset), Some(40));
    }

    #[test]
    fn test_new_animation_cancels_previous() {
        let mut animator = ScrollAnimator::new();
        let target = ScrollTarget {
            index: 0,
            pixel_offset: 0,
            animated: true,
        };
        let first = animator.start(target);
        assert!(!first.is_cancelled());

        let second = animator.start(ScrollTarget { index: 1, ..target });
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        animator.cancel();
        assert!(second.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let mut animator = ScrollAnimator::new();
        let animation = animator.start(ScrollTarget {
            index: 0,
            pixel_offset: 0,
            animated: true,
        });
        animator.cancel();
        animation.cancelled().await;
    }
}
