//! Video source metadata.
//!
//! [`VideoMetadata`] is produced by the probe at the start of every run. The
//! duration is unknown until the probe has completed, which is why the
//! sampler only runs afterwards.

use std::time::Duration;

/// Metadata for the video stream of a source.
///
/// # Example
///
/// ```no_run
/// use scrollframe::VideoSource;
///
/// let source = VideoSource::open("intro.mp4")?;
/// let metadata = source.metadata();
/// println!(
///     "{}x{} @ {:.2} fps, {:?} [{}]",
///     metadata.width, metadata.height, metadata.frames_per_second,
///     metadata.duration, metadata.codec,
/// );
/// # Ok::<(), scrollframe::ScrollFrameError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Total duration. [`Duration::ZERO`] when the container does not say.
    pub duration: Duration,
    /// Natural frame width in pixels.
    pub width: u32,
    /// Natural frame height in pixels.
    pub height: u32,
    /// Average frame rate reported by the stream, 0.0 when unknown.
    pub frames_per_second: f64,
    /// Estimated total frame count from duration and frame rate.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
}

impl VideoMetadata {
    /// Width divided by height, or 0.0 for a degenerate size.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}
