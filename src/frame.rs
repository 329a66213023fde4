//! Decoded frames and their release accounting.
//!
//! Every [`DecodedFrame`] is registered with the [`FrameLedger`] of the run
//! that produced it and deregisters itself exactly once when dropped. A run
//! that has been torn down therefore shows a live count of zero once every
//! consumer has let go of its frames.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use image::RgbaImage;

use crate::sampler::SampleTimestamp;

/// Live/allocated frame counters shared by one run and its frames.
#[derive(Debug, Clone, Default)]
pub struct FrameLedger {
    counters: Arc<LedgerCounters>,
}

#[derive(Debug, Default)]
struct LedgerCounters {
    allocated: AtomicUsize,
    live: AtomicUsize,
}

impl FrameLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames registered and not yet released.
    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::Acquire)
    }

    /// Frames ever registered with this ledger.
    pub fn allocated(&self) -> usize {
        self.counters.allocated.load(Ordering::Acquire)
    }

    /// Frames released so far.
    pub fn released(&self) -> usize {
        self.allocated().saturating_sub(self.live())
    }

    fn register(&self) -> ReleaseGuard {
        self.counters.allocated.fetch_add(1, Ordering::AcqRel);
        self.counters.live.fetch_add(1, Ordering::AcqRel);
        ReleaseGuard {
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Decrements the live count when the owning frame goes away.
#[derive(Debug)]
struct ReleaseGuard {
    counters: Arc<LedgerCounters>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// An immutable decoded bitmap taken at one sample timestamp.
#[derive(Debug)]
pub struct DecodedFrame {
    image: RgbaImage,
    timestamp: SampleTimestamp,
    sample_index: usize,
    _guard: ReleaseGuard,
}

impl DecodedFrame {
    /// Wrap a raster and register it with `ledger`.
    pub fn new(
        image: RgbaImage,
        timestamp: SampleTimestamp,
        sample_index: usize,
        ledger: &FrameLedger,
    ) -> Self {
        Self {
            image,
            timestamp,
            sample_index,
            _guard: ledger.register(),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn timestamp(&self) -> SampleTimestamp {
        self.timestamp
    }

    /// Position of this frame's timestamp in the run's sample sequence.
    ///
    /// Differs from the frame's store index once an earlier sample failed.
    pub fn sample_index(&self) -> usize {
        self.sample_index
    }

    /// Release the bitmap now rather than at end of scope.
    pub fn release(self) {}
}
