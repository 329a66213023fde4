//! Error types for the `scrollframe` crate.
//!
//! [`ScrollFrameError`] is returned by every fallible operation. Run-level
//! failures (the source cannot be opened, has no video, or uses a codec the
//! platform cannot decode) end an extraction run. Per-frame failures are
//! recovered inside the run and only show up in the log.

use std::{io::Error as IoError, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `scrollframe` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScrollFrameError {
    /// The video resource could not be opened or probed.
    #[error("Video source {locator} is unavailable: {reason}")]
    SourceUnavailable {
        /// Path or URL that was requested.
        locator: String,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The source opened but carries no video stream.
    #[error("No video stream found in source")]
    NoVideoStream,

    /// No decoder is available for the source's video codec.
    #[error("Unsupported video codec: {0}")]
    UnsupportedCodec(String),

    /// A single sample could not be decoded.
    #[error("Failed to decode frame: {0}")]
    FrameDecode(String),

    /// The frame at a sample timestamp lies past the end of the stream.
    #[error("No frame at or after {0:?}")]
    EndOfStream(Duration),

    /// Extraction options were rejected before a run started.
    #[error("Invalid extraction options: {0}")]
    InvalidOptions(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// The run was superseded or its token was cancelled.
    #[error("Extraction run cancelled")]
    Cancelled,
}

impl ScrollFrameError {
    /// Whether this error ends the whole extraction run.
    ///
    /// Per-frame errors return `false`: the sample is skipped and the run
    /// carries on with the next timestamp.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            ScrollFrameError::SourceUnavailable { .. }
                | ScrollFrameError::NoVideoStream
                | ScrollFrameError::UnsupportedCodec(_)
                | ScrollFrameError::InvalidOptions(_)
        )
    }
}

impl From<FfmpegError> for ScrollFrameError {
    fn from(error: FfmpegError) -> Self {
        ScrollFrameError::Ffmpeg(error.to_string())
    }
}
