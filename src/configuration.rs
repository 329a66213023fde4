//! Extraction configuration.
//!
//! [`ExtractOptions`] is a builder that carries the frame budget, the
//! assumed source frame rate, the raster bounds, the decode strategy, and
//! the progress and cancellation hooks of an extraction run.
//!
//! # Example
//!
//! ```no_run
//! use scrollframe::{CancellationToken, DecodeStrategy, ExtractOptions};
//!
//! let token = CancellationToken::new();
//! let options = ExtractOptions::new()
//!     .with_max_frames(45)
//!     .with_bounds(1280, 720)
//!     .with_strategy(DecodeStrategy::Sequential)
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::decoder::DecodeStrategy;
use crate::error::ScrollFrameError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default maximum raster width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 1920;
/// Default maximum raster height in pixels.
pub const DEFAULT_MAX_HEIGHT: u32 = 1080;
/// Default frame budget per run.
pub const DEFAULT_MAX_FRAMES: usize = 60;
/// Default assumed source frame rate.
pub const DEFAULT_BASE_FPS: f64 = 30.0;

/// Upper bounds for the intermediate raster a frame is decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBounds {
    /// Maximum raster width in pixels.
    pub max_width: u32,
    /// Maximum raster height in pixels.
    pub max_height: u32,
}

impl Default for FrameBounds {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

impl FrameBounds {
    /// Fit a `source_width` x `source_height` frame inside the bounds.
    ///
    /// The long edge is shrunk first, then the other edge if it still
    /// overflows. Frames that already fit keep their size; frames are never
    /// upscaled. Returns `(width, height)`, each at least 1.
    pub fn fit(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        if source_width == 0 || source_height == 0 {
            return (source_width.max(1), source_height.max(1));
        }

        let max_width = self.max_width.max(1) as f64;
        let max_height = self.max_height.max(1) as f64;
        let mut width = source_width as f64;
        let mut height = source_height as f64;

        let shrink_width = |width: &mut f64, height: &mut f64| {
            if *width > max_width {
                *height *= max_width / *width;
                *width = max_width;
            }
        };
        let shrink_height = |width: &mut f64, height: &mut f64| {
            if *height > max_height {
                *width *= max_height / *height;
                *height = max_height;
            }
        };

        if source_width >= source_height {
            shrink_width(&mut width, &mut height);
            shrink_height(&mut width, &mut height);
        } else {
            shrink_height(&mut width, &mut height);
            shrink_width(&mut width, &mut height);
        }

        ((width.round() as u32).max(1), (height.round() as u32).max(1))
    }
}

/// Options for one extraction run.
///
/// A default-constructed value uses a 1920x1080 raster bound, a budget of
/// 60 frames, an assumed 30 fps source, seek-per-sample decoding, no
/// progress callback and no external cancellation.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) bounds: FrameBounds,
    pub(crate) max_frames: usize,
    pub(crate) base_fps: f64,
    pub(crate) strategy: DecodeStrategy,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("bounds", &self.bounds)
            .field("max_frames", &self.max_frames)
            .field("base_fps", &self.base_fps)
            .field("strategy", &self.strategy)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with the default settings.
    pub fn new() -> Self {
        Self {
            bounds: FrameBounds::default(),
            max_frames: DEFAULT_MAX_FRAMES,
            base_fps: DEFAULT_BASE_FPS,
            strategy: DecodeStrategy::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Set the maximum raster size frames are decoded into.
    #[must_use]
    pub fn with_bounds(mut self, max_width: u32, max_height: u32) -> Self {
        self.bounds = FrameBounds {
            max_width,
            max_height,
        };
        self
    }

    /// Set the frame budget.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Set the frame rate the source is assumed to have.
    #[must_use]
    pub fn with_base_fps(mut self, base_fps: f64) -> Self {
        self.base_fps = base_fps;
        self
    }

    /// Choose how the decoder reaches each sample timestamp.
    #[must_use]
    pub fn with_strategy(mut self, strategy: DecodeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach an external cancellation token.
    ///
    /// The engine additionally cancels a run on its own when a newer run
    /// supersedes it.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn bounds(&self) -> FrameBounds {
        self.bounds
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn base_fps(&self) -> f64 {
        self.base_fps
    }

    pub fn strategy(&self) -> DecodeStrategy {
        self.strategy
    }

    /// Reject settings no run could honour.
    ///
    /// # Errors
    ///
    /// [`ScrollFrameError::InvalidOptions`] for a zero raster bound, a zero
    /// frame budget, or a base frame rate that is not a positive number.
    pub fn validate(&self) -> Result<(), ScrollFrameError> {
        if self.bounds.max_width == 0 || self.bounds.max_height == 0 {
            return Err(ScrollFrameError::InvalidOptions(format!(
                "raster bounds must be non-zero, got {}x{}",
                self.bounds.max_width, self.bounds.max_height
            )));
        }
        if self.max_frames == 0 {
            return Err(ScrollFrameError::InvalidOptions(
                "frame budget must be at least 1".to_string(),
            ));
        }
        if !self.base_fps.is_finite() || self.base_fps <= 0.0 {
            return Err(ScrollFrameError::InvalidOptions(format!(
                "base frame rate must be positive, got {}",
                self.base_fps
            )));
        }
        Ok(())
    }

    /// Whether the external token, if any, has been cancelled.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
