//! Scroll-to-frame mapping.
//!
//! A scroll region turns a raw scroll offset into progress in `[0, 1]`;
//! [`frame_index`] turns progress into a store index. Both clamp, so any
//! input rate or overshoot (rubber-band scrolling, momentum) is safe.

/// The document range over which scroll progress is measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRegion {
    /// Scroll offset where progress is 0.
    pub start: f64,
    /// Scroll offset where progress is 1.
    pub end: f64,
}

impl ScrollRegion {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Progress of `offset` through the region, clamped to `[0, 1]`.
    ///
    /// A zero-length region reports 0 before its anchor and 1 from it on.
    pub fn progress(&self, offset: f64) -> f64 {
        let length = self.end - self.start;
        if !length.is_finite() || length.abs() < f64::EPSILON {
            return if offset >= self.start { 1.0 } else { 0.0 };
        }
        clamp_progress((offset - self.start) / length)
    }
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Map scroll progress to a frame index.
///
/// `round(clamp(progress, 0, 1) * (frame_count - 1))`, or `None` when there
/// are no frames. NaN progress maps to the first frame.
///
/// # Example
///
/// ```
/// use scrollframe::frame_index;
///
/// assert_eq!(frame_index(0.55, 10), Some(5));
/// assert_eq!(frame_index(1.4, 10), Some(9));
/// assert_eq!(frame_index(0.3, 0), None);
/// ```
pub fn frame_index(progress: f64, frame_count: usize) -> Option<usize> {
    if frame_count == 0 {
        return None;
    }
    let last = (frame_count - 1) as f64;
    let index = (clamp_progress(progress) * last).round() as usize;
    Some(index.min(frame_count - 1))
}

/// Keeps the latest scroll progress and frame count and the index they
/// select.
#[derive(Debug, Clone, Default)]
pub struct ScrollMapper {
    progress: f64,
    frame_count: usize,
}

impl ScrollMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record new scroll progress and return the selected index.
    pub fn set_progress(&mut self, progress: f64) -> Option<usize> {
        self.progress = clamp_progress(progress);
        self.index()
    }

    /// Record a new frame count and return the selected index.
    pub fn set_frame_count(&mut self, frame_count: usize) -> Option<usize> {
        self.frame_count = frame_count;
        self.index()
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn index(&self) -> Option<usize> {
        frame_index(self.progress, self.frame_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_frames() {
        assert_eq!(frame_index(0.0, 10), Some(0));
        assert_eq!(frame_index(1.0, 10), Some(9));
        assert_eq!(frame_index(0.55, 10), Some(5));
        assert_eq!(frame_index(-0.2, 10), Some(0));
        assert_eq!(frame_index(1.4, 10), Some(9));
    }

    #[test]
    fn degenerate_counts() {
        assert_eq!(frame_index(0.7, 0), None);
        assert_eq!(frame_index(0.7, 1), Some(0));
        assert_eq!(frame_index(f64::NAN, 4), Some(0));
        assert_eq!(frame_index(f64::INFINITY, 4), Some(3));
    }

    #[test]
    fn mapper_follows_growing_store() {
        let mut mapper = ScrollMapper::new();
        assert_eq!(mapper.set_progress(0.5), None);
        assert_eq!(mapper.set_frame_count(1), Some(0));
        assert_eq!(mapper.set_frame_count(5), Some(2));
        assert_eq!(mapper.set_frame_count(11), Some(5));
        assert_eq!(mapper.set_progress(2.0), Some(10));
    }

    #[test]
    fn region_progress_is_clamped() {
        let region = ScrollRegion::new(200.0, 1200.0);
        assert_eq!(region.progress(0.0), 0.0);
        assert_eq!(region.progress(700.0), 0.5);
        assert_eq!(region.progress(5000.0), 1.0);

        let point = ScrollRegion::new(300.0, 300.0);
        assert_eq!(point.progress(299.0), 0.0);
        assert_eq!(point.progress(300.0), 1.0);
    }
}
