use crate::error::CoreError;
use async_trait::async_trait;

/// Reserved raw value a lyrics source stores for "lookup completed, nothing found".
pub const NOT_FOUND_SENTINEL: &str = "LYRICS_NOT_FOUND";

/// Raw lyrics as handed over by the lyrics-source collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LyricsPayload {
    /// Nothing fetched yet
    #[default]
    NotLoaded,
    /// Lookup confirmed there are no lyrics
    NotFound,
    /// Raw text, LRC or plain
    Raw(String),
}

impl LyricsPayload {
    /// Map a stored raw value, where `None` means "not yet loaded" and
    /// [`NOT_FOUND_SENTINEL`] means "confirmed not found".
    #[must_use]
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None => Self::NotLoaded,
            Some(text) if text == NOT_FOUND_SENTINEL => Self::NotFound,
            Some(text) => Self::Raw(text.to_string()),
        }
    }

    /// Check if lyrics were found
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

/// Query parameters for fetching lyrics
#[derive(Debug, Clone)]
pub struct LyricsQuery {
    /// Track name
    pub track_name: String,
    /// Artist name
    pub artist_name: String,
    /// Album name (optional)
    pub album_name: Option<String>,
    /// Track duration in seconds (for matching)
    pub duration_secs: Option<u32>,
}

impl LyricsQuery {
    /// Create a new lyrics query
    pub fn new(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            album_name: None,
            duration_secs: None,
        }
    }

    /// Set album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album_name = Some(album.into());
        self
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}

/// Lyrics with provider metadata
#[derive(Debug, Clone)]
pub struct FetchedLyrics {
    pub payload: LyricsPayload,
    /// Name of the source that answered (e.g. "file", "lrclib")
    pub provider: String,
    /// Provider-specific ID of the lyrics, if the source has one
    pub provider_id: Option<String>,
}

/// Trait for lyrics sources. Fetching, searching and caching happen behind it;
/// the engine only consumes the resulting payload.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Fetch lyrics for a query
    async fn fetch(&self, query: &LyricsQuery) -> Result<FetchedLyrics, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_raw() {
        assert_eq!(LyricsPayload::from_raw(None), LyricsPayload::NotLoaded);
        assert_eq!(
            LyricsPayload::from_raw(Some(NOT_FOUND_SENTINEL)),
            LyricsPayload::NotFound
        );
        assert_eq!(
            LyricsPayload::from_raw(Some("[00:01.00]hi")),
            LyricsPayload::Raw("[00:01.00]hi".to_string())
        );
    }

    #[test]
    fn test_payload_is_found() {
        assert!(!LyricsPayload::NotLoaded.is_found());
        assert!(!LyricsPayload::NotFound.is_found());
        assert!(LyricsPayload::Raw(String::new()).is_found());
    }

    #[test]
    fn test_query_builder() {
        let query = LyricsQuery::new("Song", "Artist")
            .with_album("Album")
            .with_duration(183);
        assert_eq!(query.track_name, "Song");
        assert_eq!(query.artist_name, "Artist");
        assert_eq!(query.album_name.as_deref(), Some("Album"));
        assert_eq!(query.duration_secs, Some(183));
    }
}
