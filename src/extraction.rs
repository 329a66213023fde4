//! Extraction runs.
//!
//! A run takes a [`FrameDecoder`] from `Idle` through `Probing` (reading the
//! source metadata and computing sample timestamps) and `Decoding` to one of
//! the terminal states `Complete`, `Cancelled` or `Failed`.
//! [`FrameExtraction`] is the run itself, exposed as a lazy iterator: nothing
//! is probed or decoded until the first call to `next`.
//!
//! Samples that fail to decode are logged and skipped; the following frames
//! shift down by one store index. Errors that make the whole source unusable
//! are yielded once, after which the run is `Failed` and yields nothing more.
//!
//! # Example
//!
//! ```no_run
//! use scrollframe::{DecodeStrategy, ExtractOptions, FfmpegDecoder, FrameExtraction};
//!
//! let options = ExtractOptions::new().with_max_frames(30);
//! let decoder = FfmpegDecoder::open("intro.mp4", options.strategy())?;
//!
//! for frame in FrameExtraction::new(decoder, &options) {
//!     let frame = frame?;
//!     println!("{:?} -> {}x{}", frame.timestamp(), frame.width(), frame.height());
//! }
//! # Ok::<(), scrollframe::ScrollFrameError>(())
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    iter::FusedIterator,
    sync::PoisonError,
};

use crate::{
    configuration::ExtractOptions,
    decoder::FrameDecoder,
    error::ScrollFrameError,
    frame::{DecodedFrame, FrameLedger},
    metadata::VideoMetadata,
    progress::{CancellationToken, ProgressTracker},
    sampler::{SampleTimestamp, sample_timestamps},
    store::{CommitOutcome, SharedFrameStore},
};

/// Identity of one extraction run.
///
/// Run identities are handed out in increasing order by the engine; the
/// store and the progress relay compare them to decide whether a run is
/// still the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RunId(u64);

impl RunId {
    /// The identity of "no run"; never active.
    pub const NONE: RunId = RunId(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// Awaiting source metadata.
    Probing,
    /// Iterating sample timestamps.
    Decoding,
    Complete,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Complete | RunState::Cancelled | RunState::Failed)
    }
}

/// Summary of a finished (or abandoned) run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: RunId,
    pub state: RunState,
    /// Frames produced by the run.
    pub frames: usize,
    /// Samples that failed to decode and were skipped.
    pub skipped: usize,
    /// Number of sample timestamps the run planned.
    pub samples: usize,
    /// Source metadata, when the probe succeeded.
    pub metadata: Option<VideoMetadata>,
}

impl RunOutcome {
    /// Outcome of a run whose worker never reported back.
    pub(crate) fn aborted(run: RunId) -> Self {
        Self {
            run,
            state: RunState::Cancelled,
            frames: 0,
            skipped: 0,
            samples: 0,
            metadata: None,
        }
    }
}

/// One extraction run over a decoder.
pub struct FrameExtraction<D: FrameDecoder> {
    run: RunId,
    decoder: D,
    options: ExtractOptions,
    token: CancellationToken,
    ledger: FrameLedger,
    state: RunState,
    metadata: Option<VideoMetadata>,
    timestamps: Vec<SampleTimestamp>,
    next_sample: usize,
    produced: usize,
    skipped: usize,
    tracker: Option<ProgressTracker>,
}

impl<D: FrameDecoder> FrameExtraction<D> {
    /// Prepare a run. Nothing happens until the first call to `next`.
    pub fn new(decoder: D, options: &ExtractOptions) -> Self {
        Self {
            run: RunId::new(1),
            decoder,
            options: options.clone(),
            token: CancellationToken::new(),
            ledger: FrameLedger::new(),
            state: RunState::Idle,
            metadata: None,
            timestamps: Vec::new(),
            next_sample: 0,
            produced: 0,
            skipped: 0,
            tracker: None,
        }
    }

    /// Tag the run's progress reports and store commits with `run`.
    #[must_use]
    pub fn with_run_id(mut self, run: RunId) -> Self {
        self.run = run;
        self
    }

    /// Use `token` as the run's own cancellation flag.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Register produced frames with `ledger`.
    #[must_use]
    pub fn with_ledger(mut self, ledger: FrameLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn run_id(&self) -> RunId {
        self.run
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn ledger(&self) -> &FrameLedger {
        &self.ledger
    }

    /// Sample timestamps planned by the probe; empty before it ran.
    pub fn timestamps(&self) -> &[SampleTimestamp] {
        &self.timestamps
    }

    /// Last progress percentage reported, 0 before the run started.
    pub fn percent(&self) -> u8 {
        self.tracker.as_ref().map_or(0, ProgressTracker::percent)
    }

    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            run: self.run,
            state: self.state,
            frames: self.produced,
            skipped: self.skipped,
            samples: self.timestamps.len(),
            metadata: self.metadata.clone(),
        }
    }

    /// Drive the run to its end, committing every frame into `store`.
    ///
    /// Stops early, as `Cancelled`, as soon as the store has been handed to
    /// another run. A run that ends `Cancelled` or `Failed` while it still
    /// owns the store clears the frames it committed.
    ///
    /// # Errors
    ///
    /// The run-level error that ended the run in `Failed`.
    pub fn commit_into(mut self, store: &SharedFrameStore) -> Result<RunOutcome, ScrollFrameError> {
        let mut failure = None;
        while let Some(result) = self.next() {
            let frame = match result {
                Ok(frame) => frame,
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            };
            let outcome = store
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .commit(self.run, frame);

            match outcome {
                CommitOutcome::Stored(_) => {}
                CommitOutcome::StaleRun => {
                    log::debug!("Run {} lost the frame store; stopping", self.run);
                    self.finish(RunState::Cancelled);
                    break;
                }
                rejected => log::warn!("Run {} frame dropped by store: {rejected:?}", self.run),
            }
        }

        if matches!(self.state, RunState::Cancelled | RunState::Failed) {
            self.discard_from(store);
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(self.outcome()),
        }
    }

    /// Release this run's committed frames if it still owns `store`.
    fn discard_from(&self, store: &SharedFrameStore) {
        let mut store = store.write().unwrap_or_else(PoisonError::into_inner);
        if store.run() == self.run && !store.is_empty() {
            log::debug!("Run {} ended {:?}; releasing {} stored frame(s)", self.run, self.state, store.len());
            store.clear();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.options.is_cancelled()
    }

    fn finish(&mut self, state: RunState) {
        self.state = state;
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.finish(state);
        }
        match state {
            RunState::Complete => log::info!(
                "Run {} complete: {} frame(s), {} skipped",
                self.run,
                self.produced,
                self.skipped,
            ),
            RunState::Cancelled => log::debug!("Run {} cancelled after {} frame(s)", self.run, self.produced),
            _ => log::debug!("Run {} ended in {state:?}", self.run),
        }
    }

    fn probe(&mut self) -> Result<(), ScrollFrameError> {
        self.options.validate()?;
        let metadata = self.decoder.probe()?;
        self.timestamps = sample_timestamps(
            metadata.duration,
            self.options.base_fps,
            self.options.max_frames,
        );
        if self.timestamps.is_empty() {
            log::warn!("Run {}: source reports no frames to sample", self.run);
        } else {
            log::debug!("Run {}: sampling {} timestamp(s)", self.run, self.timestamps.len());
        }
        self.metadata = Some(metadata);
        Ok(())
    }
}

impl<D: FrameDecoder> Iterator for FrameExtraction<D> {
    type Item = Result<DecodedFrame, ScrollFrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                RunState::Idle | RunState::Probing => {
                    self.state = RunState::Probing;
                    self.tracker = Some(ProgressTracker::start(
                        self.options.progress.clone(),
                        self.run,
                        self.options.max_frames as u64,
                    ));
                    if let Err(error) = self.probe() {
                        log::warn!("Run {} failed: {error}", self.run);
                        self.finish(RunState::Failed);
                        return Some(Err(error));
                    }
                    self.state = RunState::Decoding;
                }
                RunState::Decoding => {
                    if self.is_cancelled() {
                        self.finish(RunState::Cancelled);
                        return None;
                    }

                    let Some(&timestamp) = self.timestamps.get(self.next_sample) else {
                        self.finish(RunState::Complete);
                        return None;
                    };
                    let sample_index = self.next_sample;
                    self.next_sample += 1;

                    match self.decoder.decode_at(timestamp, self.options.bounds) {
                        Ok(image) => {
                            let frame = DecodedFrame::new(image, timestamp, sample_index, &self.ledger);
                            if self.is_cancelled() {
                                frame.release();
                                self.finish(RunState::Cancelled);
                                return None;
                            }
                            self.produced += 1;
                            if let Some(tracker) = self.tracker.as_mut() {
                                tracker.advance(timestamp.offset());
                            }
                            return Some(Ok(frame));
                        }
                        Err(ScrollFrameError::Cancelled) => {
                            self.finish(RunState::Cancelled);
                            return None;
                        }
                        Err(error) if error.is_run_fatal() => {
                            log::warn!("Run {} failed: {error}", self.run);
                            self.finish(RunState::Failed);
                            return Some(Err(error));
                        }
                        Err(error) => {
                            log::warn!(
                                "Run {}: skipping sample {sample_index} at {:.3}s: {error}",
                                self.run,
                                timestamp.as_secs_f64(),
                            );
                            self.skipped += 1;
                        }
                    }
                }
                RunState::Complete | RunState::Cancelled | RunState::Failed => return None,
            }
        }
    }
}

impl<D: FrameDecoder> FusedIterator for FrameExtraction<D> {}

impl<D: FrameDecoder> Drop for FrameExtraction<D> {
    fn drop(&mut self) {
        if self.state != RunState::Idle && !self.state.is_terminal() {
            self.finish(RunState::Cancelled);
        }
    }
}

/// Start a lazy extraction run over `decoder`.
///
/// Shorthand for [`FrameExtraction::new`].
pub fn extract<D: FrameDecoder>(decoder: D, options: &ExtractOptions) -> FrameExtraction<D> {
    FrameExtraction::new(decoder, options)
}
