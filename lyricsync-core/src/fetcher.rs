//! Lyrics fetcher that asks a chain of lyrics sources and loads the result.

use std::sync::Arc;
use tracing::{info, warn};

use crate::parser::{is_time_tagged, LyricsStatus};
use crate::provider::{FetchedLyrics, LyricsPayload, LyricsQuery, LyricsSource};
use crate::sync::SyncEngine;

const LOG_TARGET: &str = "lyricsync::fetcher";

/// Tries sources in order and feeds the best payload to the engine
pub struct LyricsFetcher {
    sync_engine: Arc<SyncEngine>,
    sources: Vec<Box<dyn LyricsSource>>,
}

impl LyricsFetcher {
    /// Create a new lyrics fetcher
    ///
    /// # Arguments
    /// * `sync_engine` - Engine the fetched lyrics are loaded into
    /// * `sources` - Lyrics sources to try in order
    pub fn new(sync_engine: Arc<SyncEngine>, sources: Vec<Box<dyn LyricsSource>>) -> Self {
        Self {
            sync_engine,
            sources,
        }
    }

    /// Fetch lyrics for `query` and load them into the engine.
    ///
    /// The engine is cleared while the lookup runs so the previous track's
    /// lyrics are never shown against the new track.
    pub async fn load(&self, query: &LyricsQuery) -> LyricsStatus {
        self.sync_engine.load(&LyricsPayload::NotLoaded).await;
        let payload = self.fetch(query).await;
        self.sync_engine.load(&payload).await
    }

    /// Ask each source in turn.
    ///
    /// Time-tagged lyrics win immediately. Plain lyrics are kept as a
    /// fallback while the remaining sources are tried.
    pub async fn fetch(&self, query: &LyricsQuery) -> LyricsPayload {
        let source_names: Vec<_> = self.sources.iter().map(|s| s.name()).collect();
        info!(
            target: LOG_TARGET,
            "Fetching lyrics for: {} - {} (sources: {:?})",
            query.artist_name, query.track_name, source_names
        );

        let mut fallback: Option<FetchedLyrics> = None;

        for source in &self.sources {
            match source.fetch(query).await {
                Ok(fetched) => match &fetched.payload {
                    LyricsPayload::Raw(raw) if is_time_tagged(raw) => {
                        info!(
                            target: LOG_TARGET,
                            "Found synced lyrics from {} (provider_id: {:?})",
                            fetched.provider,
                            fetched.provider_id
                        );
                        return fetched.payload;
                    }
                    LyricsPayload::Raw(_) => {
                        info!(
                            target: LOG_TARGET,
                            "Source {} returned unsynced lyrics",
                            source.name()
                        );
                        fallback.get_or_insert(fetched);
                    }
                    LyricsPayload::NotFound | LyricsPayload::NotLoaded => {
                        info!(target: LOG_TARGET, "Source {} returned no lyrics", source.name());
                    }
                },
                Err(e) => {
                    warn!(target: LOG_TARGET, "Source {} failed with error: {}", source.name(), e);
                }
            }
        }

        if let Some(fetched) = fallback {
            info!(
                target: LOG_TARGET,
                "Using unsynced lyrics from {}", fetched.provider
            );
            return fetched.payload;
        }

        info!(
            target: LOG_TARGET,
            "No lyrics found for {} - {} (tried {} sources)",
            query.artist_name,
            query.track_name,
            self.sources.len()
        );
        LyricsPayload::NotFound
    }
}
