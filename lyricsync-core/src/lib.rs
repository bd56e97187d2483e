pub mod config;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod karaoke;
pub mod parser;
pub mod paths;
pub mod playback;
pub mod provider;
pub mod resolver;
pub mod romanize;
pub mod scroll;
pub mod selection;
pub mod sync;
pub mod time;
pub mod tracker;

pub use config::{
    KaraokeConfig, LoggingConfig, LyricsyncConfig, RomanizationConfig, ScrollConfig,
    SelectionConfig, SyncConfig, CONFIG_TEMPLATE,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use document::{DocumentGuard, DocumentId, LyricsDocument, LyricsEntry, LyricsMetadata};
pub use error::CoreError;
pub use fetcher::LyricsFetcher;
pub use karaoke::{WordFill, WordTimingEstimator};
pub use parser::{parse, parse_payload, LyricsStatus};
pub use paths::{config_dir, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME};
pub use playback::{PlaybackClock, PlaybackControl, PlaybackSample};
pub use provider::{FetchedLyrics, LyricsPayload, LyricsQuery, LyricsSource, NOT_FOUND_SENTINEL};
pub use resolver::{resolve, ResolverState};
pub use romanize::{BuiltinTransliterator, RomanizationAnnotator, Script, Transliterator};
pub use scroll::{
    DetachedViewport, LinePosition, ScrollAnimation, ScrollAnimator, ScrollCoordinator,
    ScrollTarget, Viewport,
};
pub use selection::{SelectionOutcome, SelectionState};
pub use sync::{LyricsFrame, SyncEngine, SyncEvent};
pub use time::DurationExt;
pub use tracker::{PreviewTracker, TrackerState, TrackerTick};
