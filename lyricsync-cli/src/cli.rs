use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lyricsync")]
#[command(about = "Play back a lyrics file against a simulated clock")]
#[command(version)]
pub struct Cli {
    /// Lyrics file, time-tagged LRC or plain text
    pub lyrics: PathBuf,

    /// Config file (defaults to ~/.config/lyricsync/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Playback position to start from, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub start_ms: u64,

    /// Track length in milliseconds (defaults to the `length` tag or the last line plus a margin)
    #[arg(long)]
    pub duration_ms: Option<u64>,

    /// Print frames as JSON lines
    #[arg(long)]
    pub json: bool,
}
