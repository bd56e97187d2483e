//! Terminal rendering of engine frames.

use lyricsync_core::{LyricsDocument, LyricsFrame};
use std::sync::Arc;

/// Prints a line each time the active line changes.
pub struct FramePrinter {
    document: Arc<LyricsDocument>,
    json: bool,
    last_line: Option<usize>,
}

impl FramePrinter {
    pub const fn new(document: Arc<LyricsDocument>, json: bool) -> Self {
        Self {
            document,
            json,
            last_line: None,
        }
    }

    /// Print `frame` if it moved to another line.
    pub fn print(&mut self, frame: &LyricsFrame) -> Result<(), serde_json::Error> {
        if frame.document_id != self.document.id() || frame.current_line == self.last_line {
            return Ok(());
        }
        self.last_line = frame.current_line;

        if self.json {
            println!("{}", serde_json::to_string(frame)?);
        } else if let Some(line) = self.render(frame) {
            println!("{line}");
        }
        Ok(())
    }

    fn render(&self, frame: &LyricsFrame) -> Option<String> {
        let entry = self.document.entry(frame.current_line?)?;
        let mut line = if frame.synced {
            format!("[{}] {}", format_timestamp(entry.time_ms), entry.text)
        } else {
            entry.text.clone()
        };
        if let Some(romanized) = entry.romanized.get() {
            line.push_str(&format!("  ({romanized})"));
        }
        Some(line)
    }
}

/// `mm:ss.xx`, the LRC time-tag format
fn format_timestamp(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let centis = (ms % 1_000) / 10;
    format!("{minutes:02}:{seconds:02}.{centis:02}")
}
