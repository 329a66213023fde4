//! The frame store.
//!
//! [`FrameStore`] holds the decoded frames of exactly one run, in sample
//! order. It is stamped with the [`RunId`] allowed to write into it, so a
//! superseded run that is still winding down cannot slip a frame in after
//! the store has been handed to its successor.

use std::sync::{Arc, RwLock};

use crate::{extraction::RunId, frame::DecodedFrame};

/// A store shared between the extraction worker and the renderer.
pub type SharedFrameStore = Arc<RwLock<FrameStore>>;

/// Result of offering a frame to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The frame was appended at this index.
    Stored(usize),
    /// The frame belongs to a run that no longer owns the store.
    StaleRun,
    /// The store already holds its full frame budget.
    Full,
    /// The frame's timestamp is earlier than the last stored one.
    OutOfOrder,
}

/// Ordered, index-addressable, bounded collection of decoded frames.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use image::RgbaImage;
/// use scrollframe::{CommitOutcome, DecodedFrame, FrameLedger, FrameStore, RunId, SampleTimestamp};
///
/// let ledger = FrameLedger::new();
/// let mut store = FrameStore::new(2);
/// store.reset(RunId::new(1), 2);
///
/// let frame = DecodedFrame::new(
///     RgbaImage::new(16, 9),
///     SampleTimestamp::new(Duration::ZERO),
///     0,
///     &ledger,
/// );
/// assert_eq!(store.commit(RunId::new(1), frame), CommitOutcome::Stored(0));
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct FrameStore {
    run: RunId,
    capacity: usize,
    frames: Vec<Arc<DecodedFrame>>,
}

impl FrameStore {
    /// Create an empty store owned by no run.
    pub fn new(capacity: usize) -> Self {
        Self {
            run: RunId::NONE,
            capacity,
            frames: Vec::new(),
        }
    }

    /// Drop every held frame and hand the store to `run`.
    pub fn reset(&mut self, run: RunId, capacity: usize) {
        self.frames.clear();
        self.frames.shrink_to_fit();
        self.run = run;
        self.capacity = capacity;
    }

    /// Append `frame` if `run` owns the store and the budget allows it.
    ///
    /// A rejected frame is dropped, which releases it.
    pub fn commit(&mut self, run: RunId, frame: DecodedFrame) -> CommitOutcome {
        if run != self.run {
            return CommitOutcome::StaleRun;
        }
        if self.frames.len() >= self.capacity {
            return CommitOutcome::Full;
        }
        if self
            .frames
            .last()
            .is_some_and(|last| last.timestamp() > frame.timestamp())
        {
            return CommitOutcome::OutOfOrder;
        }

        self.frames.push(Arc::new(frame));
        CommitOutcome::Stored(self.frames.len() - 1)
    }

    /// Release every frame but keep the current owner.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn get(&self, index: usize) -> Option<Arc<DecodedFrame>> {
        self.frames.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The run currently allowed to write.
    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DecodedFrame>> {
        self.frames.iter()
    }
}
