use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricsyncConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub karaoke: KaraokeConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub romanization: RomanizationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Forward bias applied when resolving the active line
    #[serde(default = "default_lookahead")]
    pub lookahead_ms: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// How long the previewed line stays up after a scrub is released
    #[serde(default = "default_preview_cooldown")]
    pub preview_cooldown_ms: u64,
    /// Line rotation interval for lyrics without time tags
    #[serde(default = "default_unsynced_rotation")]
    pub unsynced_rotation_ms: u64,
}

const fn default_lookahead() -> u64 {
    300
}

const fn default_poll_interval() -> u64 {
    50
}

const fn default_preview_cooldown() -> u64 {
    2000
}

const fn default_unsynced_rotation() -> u64 {
    3000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookahead_ms: default_lookahead(),
            poll_interval_ms: default_poll_interval(),
            preview_cooldown_ms: default_preview_cooldown(),
            unsynced_rotation_ms: default_unsynced_rotation(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KaraokeConfig {
    /// Added to the elapsed time so the fill feels responsive
    #[serde(default = "default_lead")]
    pub lead_ms: u64,
    /// Trimmed from each line window so the fill completes before the next line
    #[serde(default = "default_compression")]
    pub compression_ms: u64,
    /// Window assumed for the last line
    #[serde(default = "default_last_line")]
    pub last_line_ms: u64,
    /// Width of the soft gradient edge, as a fraction of the word
    #[serde(default = "default_edge_softness")]
    pub edge_softness: f32,
}

const fn default_lead() -> u64 {
    150
}

const fn default_compression() -> u64 {
    450
}

const fn default_last_line() -> u64 {
    3000
}

const fn default_edge_softness() -> f32 {
    0.1
}

impl Default for KaraokeConfig {
    fn default() -> Self {
        Self {
            lead_ms: default_lead(),
            compression_ms: default_compression(),
            last_line_ms: default_last_line(),
            edge_softness: default_edge_softness(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Extra scroll offset per embedded line break of the target line
    #[serde(default = "default_line_break_offset")]
    pub line_break_offset_px: i32,
    /// Central band of the viewport, as fractions of its height
    #[serde(default = "default_band_start")]
    pub band_start: f32,
    #[serde(default = "default_band_end")]
    pub band_end: f32,
}

const fn default_line_break_offset() -> i32 {
    20
}

const fn default_band_start() -> f32 {
    0.375
}

const fn default_band_end() -> f32 {
    0.5
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            line_break_offset_px: default_line_break_offset(),
            band_start: default_band_start(),
            band_end: default_band_end(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_selection_limit")]
    pub limit: usize,
}

const fn default_selection_limit() -> usize {
    5
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            limit: default_selection_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomanizationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub japanese: bool,
    #[serde(default = "default_true")]
    pub korean: bool,
    /// Upper bound on transliteration tasks running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

const fn default_true() -> bool {
    true
}

const fn default_max_concurrent() -> usize {
    4
}

impl Default for RomanizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            japanese: true,
            korean: true,
            max_concurrent: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file in the cache directory
    #[serde(default)]
    pub enabled: bool,
}

impl LyricsyncConfig {
    /// Get the configuration directory path (~/.config/lyricsync/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/lyricsync/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default location, creating a template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Same as [`Self::load_or_create`] for an explicit path.
    ///
    /// # Errors
    ///
    /// See [`Self::load_or_create`].
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        Self::load(path)
    }

    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// Returns an error on TOML syntax errors or invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(CoreError::ConfigInvalid {
                message: message.to_string(),
            })
        };

        if self.sync.poll_interval_ms == 0 {
            return invalid("sync.poll_interval_ms must be greater than 0");
        }
        if self.sync.unsynced_rotation_ms == 0 {
            return invalid("sync.unsynced_rotation_ms must be greater than 0");
        }
        if self.selection.limit == 0 {
            return invalid("selection.limit must be greater than 0");
        }
        if self.romanization.max_concurrent == 0 {
            return invalid("romanization.max_concurrent must be greater than 0");
        }
        let band = 0.0..=1.0;
        if !band.contains(&self.scroll.band_start)
            || !band.contains(&self.scroll.band_end)
            || self.scroll.band_start > self.scroll.band_end
        {
            return invalid("scroll.band_start and scroll.band_end must satisfy 0 <= start <= end <= 1");
        }
        if !(0.0..=1.0).contains(&self.karaoke.edge_softness) {
            return invalid("karaoke.edge_softness must be between 0 and 1");
        }
        Ok(())
    }
}

/// Template written on first run
pub const CONFIG_TEMPLATE: &str = r#"# lyricsync configuration
# ~/.config/lyricsync/config.toml

[sync]
# Lines become active this long before their timestamp
lookahead_ms = 300
# How often the playback position is sampled
poll_interval_ms = 50
# How long the previewed line stays up after releasing a scrub
preview_cooldown_ms = 2000
# Line rotation interval for lyrics without time tags
unsynced_rotation_ms = 3000

[karaoke]
lead_ms = 150
compression_ms = 450
# Window assumed for the last line
last_line_ms = 3000
# Soft gradient edge, as a fraction of the word width
edge_softness = 0.1

[scroll]
# Extra offset per line break in the target line
line_break_offset_px = 20
# Central band of the viewport (fractions of its height)
band_start = 0.375
band_end = 0.5

[selection]
# Maximum number of lines that can be selected for sharing
limit = 5

[romanization]
enabled = true
japanese = true
korean = true
max_concurrent = 4

[logging]
# Also write logs to ~/.cache/lyricsync/lyricsync.log
enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_matches_defaults() {
        let parsed = LyricsyncConfig::from_toml_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(parsed, LyricsyncConfig::default());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = LyricsyncConfig::from_toml_str("").unwrap();
        assert_eq!(config.sync.lookahead_ms, 300);
        assert_eq!(config.sync.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.selection.limit, 5);
        assert!(config.romanization.enabled);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_partial_section() {
        let config = LyricsyncConfig::from_toml_str("[sync]\nlookahead_ms = 0\n").unwrap();
        assert_eq!(config.sync.lookahead_ms, 0);
        assert_eq!(config.sync.preview_cooldown_ms, 2000);
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let err = LyricsyncConfig::from_toml_str("[sync]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_rejects_inverted_band() {
        let err =
            LyricsyncConfig::from_toml_str("[scroll]\nband_start = 0.6\nband_end = 0.4\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_rejects_zero_selection_limit() {
        let err = LyricsyncConfig::from_toml_str("[selection]\nlimit = 0\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_syntax_error() {
        let err = LyricsyncConfig::from_toml_str("[sync\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_load_or_create_writes_template() {
        let dir = std::env::temp_dir().join(format!("lyricsync-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = fs::remove_file(&path);

        let err = LyricsyncConfig::load_or_create_at(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
        assert!(path.exists());

        let config = LyricsyncConfig::load_or_create_at(&path).unwrap();
        assert_eq!(config, LyricsyncConfig::default());

        let _ = fs::remove_dir_all(&dir);
    }
}
