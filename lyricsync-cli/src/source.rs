//! Lyrics source backed by a file on disk.

use async_trait::async_trait;
use lyricsync_core::{CoreError, FetchedLyrics, LyricsPayload, LyricsQuery, LyricsSource};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

pub struct FileLyricsSource {
    path: PathBuf,
}

impl FileLyricsSource {
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl LyricsSource for FileLyricsSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self, _query: &LyricsQuery) -> Result<FetchedLyrics, CoreError> {
        let payload = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => LyricsPayload::NotFound,
            Ok(content) => LyricsPayload::from_raw(Some(content.trim())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No lyrics file at {}", self.path.display());
                LyricsPayload::NotFound
            }
            Err(e) => return Err(e.into()),
        };

        Ok(FetchedLyrics {
            payload,
            provider: self.name().to_string(),
            provider_id: Some(self.path.display().to_string()),
        })
    }
}
