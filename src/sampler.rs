//! Temporal sampling.
//!
//! Decides which points of a video's timeline become frames. The source is
//! assumed to run at `base_fps`; at most `max_frames` of those nominal
//! frames are sampled, evenly spread over `[0, duration)` so that the last
//! sample always lies within one sample interval of the end.

use std::time::Duration;

/// A point in the source timeline chosen for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleTimestamp(Duration);

impl SampleTimestamp {
    pub fn new(offset: Duration) -> Self {
        Self(offset)
    }

    /// Offset from the start of the source.
    pub fn offset(self) -> Duration {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl From<SampleTimestamp> for Duration {
    fn from(timestamp: SampleTimestamp) -> Self {
        timestamp.0
    }
}

/// Number of nominal frames in `duration` at `base_fps`.
pub fn nominal_frame_count(duration: Duration, base_fps: f64) -> u64 {
    let frames = duration.as_secs_f64() * base_fps;
    if frames.is_finite() && frames > 0.0 {
        frames.floor() as u64
    } else {
        0
    }
}

/// Compute the ordered sample timestamps for one run.
///
/// With `total = floor(duration * base_fps)` and `n = min(total,
/// max_frames)`, sample `i` takes nominal frame `k_i = ceil(i * total / n)`
/// at `t_i = k_i / total * duration`. When `max_frames` divides `total` this
/// is a plain stride of `total / max_frames`; otherwise the gaps alternate
/// between `floor` and `ceil` of that ratio so the samples still reach the
/// end of the clip. The result never holds more than `max_frames` entries
/// and is empty when the source has no nominal frames (unknown or zero
/// duration, zero rate) or the budget is zero.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use scrollframe::sample_timestamps;
///
/// let samples = sample_timestamps(Duration::from_secs(2), 30.0, 10);
/// assert_eq!(samples.len(), 10);
/// assert_eq!(samples[1].offset(), Duration::from_millis(200));
/// ```
pub fn sample_timestamps(duration: Duration, base_fps: f64, max_frames: usize) -> Vec<SampleTimestamp> {
    let total = nominal_frame_count(duration, base_fps);
    if total == 0 || max_frames == 0 {
        return Vec::new();
    }

    let count = total.min(max_frames as u64);
    let seconds = duration.as_secs_f64();

    (0..count)
        .map(|sample| (sample * total).div_ceil(count))
        .map(|index| {
            let offset = index as f64 / total as f64 * seconds;
            SampleTimestamp(Duration::from_secs_f64(offset))
        })
        .collect()
}
