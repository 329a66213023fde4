//! FFmpeg console verbosity.
//!
//! FFmpeg logs to stderr on its own, independently of the [`log`] facade the
//! rest of this crate uses. Decoding dozens of seek targets from a damaged
//! file can be noisy, so hosts usually turn it down:
//!
//! ```no_run
//! use scrollframe::FfmpegLogLevel;
//!
//! scrollframe::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use ffmpeg_next::util::log::Level;

use crate::error::ScrollFrameError;

/// FFmpeg log verbosity, from silent to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    Quiet,
    Panic,
    Fatal,
    Error,
    /// FFmpeg's own default.
    Warning,
    Info,
    Verbose,
    Debug,
    Trace,
}

const LEVELS: [(FfmpegLogLevel, Level, &str); 9] = [
    (FfmpegLogLevel::Quiet, Level::Quiet, "quiet"),
    (FfmpegLogLevel::Panic, Level::Panic, "panic"),
    (FfmpegLogLevel::Fatal, Level::Fatal, "fatal"),
    (FfmpegLogLevel::Error, Level::Error, "error"),
    (FfmpegLogLevel::Warning, Level::Warning, "warning"),
    (FfmpegLogLevel::Info, Level::Info, "info"),
    (FfmpegLogLevel::Verbose, Level::Verbose, "verbose"),
    (FfmpegLogLevel::Debug, Level::Debug, "debug"),
    (FfmpegLogLevel::Trace, Level::Trace, "trace"),
];

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }

    fn from_ffmpeg_level(level: Level) -> Option<Self> {
        LEVELS
            .iter()
            .find(|(_, ffmpeg_level, _)| *ffmpeg_level == level)
            .map(|(ours, _, _)| *ours)
    }

    /// Lower-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        LEVELS
            .iter()
            .find(|(ours, _, _)| *ours == self)
            .map_or("warning", |(_, _, name)| *name)
    }
}

impl Display for FfmpegLogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = ScrollFrameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        let wanted = if wanted == "warn" { "warning".to_string() } else { wanted };
        LEVELS
            .iter()
            .find(|(_, _, name)| *name == wanted)
            .map(|(level, _, _)| *level)
            .ok_or_else(|| ScrollFrameError::InvalidOptions(format!("unknown FFmpeg log level '{value}'")))
    }
}

/// Set FFmpeg's console verbosity. Does not affect the [`log`] facade.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Current FFmpeg console verbosity, if it maps to a known level.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level()
        .ok()
        .and_then(FfmpegLogLevel::from_ffmpeg_level)
}
