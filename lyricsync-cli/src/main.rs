mod cli;
mod output;
mod source;

use crate::cli::Cli;
use crate::output::FramePrinter;
use crate::source::FileLyricsSource;
use clap::Parser;
use lyricsync_core::{
    BuiltinTransliterator, CoreError, DetachedViewport, LyricsDocument, LyricsFetcher,
    LyricsQuery, LyricsSource, LyricsyncConfig, PlaybackClock, SyncEngine, SyncEvent,
};
use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often the printer checks whether the clock ran out
const END_CHECK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
enum CliError {
    #[error("Failed to create tokio runtime: {0}")]
    Runtime(std::io::Error),

    #[error("Failed to set Ctrl+C handler: {0}")]
    CtrlC(#[from] ctrlc::Error),

    #[error("Failed to encode frame: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Check config for logging.enabled before full config load
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(LyricsyncConfig::config_path);
    init_tracing(check_file_logging_enabled(&config_path));

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            eprintln!(
                "Created a config template at {}. Edit it if needed and run again.",
                path.display()
            );
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<LyricsyncConfig, CoreError> {
    match path {
        Some(path) => LyricsyncConfig::load(path),
        None => LyricsyncConfig::load_or_create(),
    }
}

fn run(cli: &Cli, config: LyricsyncConfig) -> Result<(), CliError> {
    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    })?;

    runtime.block_on(async {
        let fallback_config = config.clone();
        let sync_engine = SyncEngine::new(config, Arc::new(BuiltinTransliterator));

        let sources: Vec<Box<dyn LyricsSource>> =
            vec![Box::new(FileLyricsSource::new(cli.lyrics.clone()))];
        let fetcher = LyricsFetcher::new(Arc::clone(&sync_engine), sources);
        let status = fetcher.load(&query_for(&cli.lyrics)).await;

        let Some(document) = status.document().cloned() else {
            info!("No lyrics in {}", cli.lyrics.display());
            return Ok(());
        };

        let duration_ms = cli
            .duration_ms
            .unwrap_or_else(|| track_duration_ms(&document, &fallback_config));
        let clock = Arc::new(PlaybackClock::new(
            Duration::from_millis(cli.start_ms),
            Duration::from_millis(duration_ms),
        ));
        clock.play();

        let mut events = sync_engine.subscribe();
        let sync_task = tokio::spawn(Arc::clone(&sync_engine).run(
            clock.clone(),
            Arc::new(DetachedViewport),
            cancel_token.clone(),
        ));

        let mut printer = FramePrinter::new(document, cli.json);
        let mut end_check = tokio::time::interval(END_CHECK_INTERVAL);

        let result = loop {
            tokio::select! {
                () = cancel_token.cancelled() => break Ok(()),
                _ = end_check.tick() => {
                    if clock.is_finished() {
                        info!("Reached end of track");
                        break Ok(());
                    }
                }
                event = events.recv() => match event {
                    Ok(SyncEvent::Frame(frame)) => {
                        if let Err(e) = printer.print(&frame) {
                            break Err(CliError::from(e));
                        }
                    }
                    Ok(SyncEvent::SelectionLimitReached { limit }) => {
                        info!("Selection limit of {limit} lines reached");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break Ok(()),
                    _ => {}
                },
            }
        };

        cancel_token.cancel();
        if let Err(e) = sync_task.await {
            error!("Sync loop task failed: {e}");
        }
        result
    })
}

/// Track length when none is given on the command line.
///
/// Prefers the `[length:]` tag. Otherwise a synced document plays until its last
/// line has had its window, and an unsynced one until every line has rotated
/// through once.
fn track_duration_ms(document: &LyricsDocument, config: &LyricsyncConfig) -> u64 {
    if let Some(length_ms) = document.metadata().length_ms {
        return length_ms;
    }
    if !document.is_synced() {
        let lines = u64::try_from(document.len()).unwrap_or(u64::MAX).max(1);
        return lines.saturating_mul(config.sync.unsynced_rotation_ms);
    }
    let last_line_ms = config.karaoke.last_line_ms;
    document
        .entries()
        .last()
        .map_or(last_line_ms, |entry| entry.time_ms.saturating_add(last_line_ms))
}

/// Query built from the lyrics file name, `Artist - Title.lrc` or just `Title.lrc`
fn query_for(path: &Path) -> LyricsQuery {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.split_once(" - ") {
        Some((artist, title)) => LyricsQuery::new(title.trim(), artist.trim()),
        None => LyricsQuery::new(stem.trim(), ""),
    }
}

fn check_file_logging_enabled(config_path: &Path) -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with stderr output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = lyricsync_core::paths::log_file_path();

        // Create cache directory if needed
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: stderr only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
