//! Contains [Args], which are parsed command-line flags.

use std::path::PathBuf;

use clap::Parser;

use media::SessionConfig;

/// Parsed command line arguments.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(about = "Plays a video file.")]
pub struct Args {
    /// The video file to play.
    pub path: PathBuf,

    /// How many frames to show per second.
    #[arg(long, default_value_t = SessionConfig::DEFAULT_FPS, value_parser = parse_fps)]
    pub fps: f64,

    /// How many decoded frames can wait to be shown before decoding pauses.
    #[arg(long, default_value_t = SessionConfig::DEFAULT_QUEUE_CAPACITY, value_parser = parse_queue_capacity)]
    pub queue_capacity: usize,

    /// Don't open a window. Frames are decoded, converted and counted, and a
    /// summary is printed at the end.
    #[arg(long)]
    pub headless: bool,

    #[cfg(debug_assertions)]
    /// Disable debug logging. This option only exists if `debug_assertions` are
    /// enabled.
    #[arg(long)]
    pub no_debug_logging: bool,

    #[cfg(debug_assertions)]
    /// Enable debug error log panics. This option only exists if
    /// `debug_assertions` are enabled.
    #[arg(long, conflicts_with = "no_debug_logging")]
    pub debug_error_log_panics: bool,
}

impl Args {
    /// The playback settings these arguments ask for.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            // `parse_fps` already made sure this works.
            tick_period: SessionConfig::period_for_fps(self.fps).unwrap_or_default(),
            queue_capacity: self.queue_capacity,
        }
    }
}

impl Default for Args {
    fn default() -> Self {
        Self::parse()
    }
}

fn parse_fps(s: &str) -> Result<f64, String> {
    let fps: f64 = s.parse().map_err(|e| format!("{e}"))?;
    SessionConfig::period_for_fps(fps)
        .map(|_| fps)
        .ok_or_else(|| format!("`{s}` isn't a positive frame rate"))
}

fn parse_queue_capacity(s: &str) -> Result<usize, String> {
    match s.parse() {
        Ok(0) => Err("the queue needs room for at least one frame".to_owned()),
        Ok(capacity) => Ok(capacity),
        Err(e) => Err(format!("{e}")),
    }
}
