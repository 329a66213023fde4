//! Load progress reporting and cooperative cancellation.
//!
//! An extraction run reports its progress as a whole percentage in
//! `[0, 100]` through a [`ProgressCallback`]. Within one run the reported
//! percentage never decreases while frames are being decoded, stays at or
//! below 99 until the run completes, and is forced to a terminal value when
//! the run ends: 100 for a completed run, 0 for a cancelled or failed one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scrollframe::{ExtractOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("run {}: {}%", info.run, info.percent);
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::extraction::{RunId, RunState};

/// A snapshot of extraction progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// The run this report belongs to.
    pub run: RunId,
    /// Load progress in `[0, 100]`.
    pub percent: u8,
    /// Frames committed so far.
    pub frames: u64,
    /// The frame budget the percentage is measured against.
    pub budget: u64,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time until the budget is exhausted, once a frame landed.
    pub estimated_remaining: Option<Duration>,
    /// Sample timestamp of the frame that triggered this report.
    pub current_timestamp: Option<Duration>,
}

/// Receives progress updates during extraction.
///
/// Callbacks are invoked from the worker thread that runs the extraction,
/// hence the `Send + Sync` bound. They observe but cannot halt a run; use a
/// [`CancellationToken`] for that.
pub trait ProgressCallback: Send + Sync {
    /// Called at run start, after every committed frame, and at run end.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Default callback that drops every report.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation flag shared between a run and its owner.
///
/// The extraction loop checks the token before every seek and before
/// committing every decoded frame.
///
/// # Example
///
/// ```
/// use scrollframe::CancellationToken;
///
/// let token = CancellationToken::new();
/// let run_view = token.clone();
/// token.cancel();
/// assert!(run_view.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Percentage for `frames` committed out of `budget`, capped at 99.
///
/// Only run completion may report 100.
pub fn loading_percent(frames: u64, budget: u64) -> u8 {
    if budget == 0 {
        return 0;
    }
    let percent = frames.saturating_mul(100) / budget;
    percent.min(99) as u8
}

/// Tracks one run's progress and forwards it to the callback.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    run: RunId,
    budget: u64,
    frames: u64,
    percent: u8,
    start_time: Instant,
}

impl ProgressTracker {
    /// Create a tracker and report the run-start value of 0.
    pub(crate) fn start(callback: Arc<dyn ProgressCallback>, run: RunId, budget: u64) -> Self {
        let tracker = Self {
            callback,
            run,
            budget,
            frames: 0,
            percent: 0,
            start_time: Instant::now(),
        };
        tracker.report(None);
        tracker
    }

    /// Record one committed frame.
    pub(crate) fn advance(&mut self, timestamp: Duration) {
        self.frames += 1;
        self.percent = self.percent.max(loading_percent(self.frames, self.budget));
        self.report(Some(timestamp));
    }

    /// Emit the terminal value for `state`.
    pub(crate) fn finish(&mut self, state: RunState) {
        self.percent = if state == RunState::Complete { 100 } else { 0 };
        self.report(None);
    }

    pub(crate) fn percent(&self) -> u8 {
        self.percent
    }

    fn report(&self, timestamp: Option<Duration>) {
        let elapsed = self.start_time.elapsed();
        let estimated_remaining = (self.frames > 0).then(|| {
            let remaining = self.budget.saturating_sub(self.frames);
            elapsed.mul_f64(remaining as f64 / self.frames as f64)
        });

        self.callback.on_progress(&ProgressInfo {
            run: self.run,
            percent: self.percent,
            frames: self.frames,
            budget: self.budget,
            elapsed,
            estimated_remaining,
            current_timestamp: timestamp,
        });
    }
}
