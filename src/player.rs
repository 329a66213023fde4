//! The scroll-driven video engine.
//!
//! [`ScrollVideo`] is what a page embeds: it owns the frame store, the
//! active extraction run, the scroll mapper and the canvas renderer. Loading
//! a new source cancels the run in flight, hands the store to the new run
//! and blanks the canvas; the superseded run can neither write frames into
//! the new store nor report progress any more.
//!
//! # Example
//!
//! ```no_run
//! use scrollframe::{ExtractOptions, FfmpegDecoder, ScrollVideo, Surface};
//!
//! # async fn example() -> Result<(), scrollframe::ScrollFrameError> {
//! let mut video = ScrollVideo::new(Surface::new(1280.0, 720.0, 2.0));
//! let options = ExtractOptions::new().with_max_frames(45);
//! let strategy = options.strategy();
//!
//! let run = video.load(move || FfmpegDecoder::open("hero.mp4", strategy), options);
//! let outcome = run.await?;
//! println!("{} frames ready", outcome.frames);
//!
//! // Later, on every scroll event:
//! video.set_scroll_progress(0.42);
//! let pixels = video.canvas();
//! # let _ = pixels;
//! # Ok(())
//! # }
//! ```

use std::{
    future::Future,
    panic,
    pin::Pin,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
};

use image::RgbaImage;
use tokio::task::JoinHandle;

use crate::{
    configuration::ExtractOptions,
    decoder::{DeferredDecoder, FrameDecoder},
    error::ScrollFrameError,
    extraction::{FrameExtraction, RunId, RunOutcome},
    frame::FrameLedger,
    mapper::{ScrollMapper, ScrollRegion},
    progress::{CancellationToken, ProgressCallback, ProgressInfo},
    renderer::{CanvasRenderer, Surface},
    store::{FrameStore, SharedFrameStore},
};

/// Scroll-synchronised video playback over pre-decoded frames.
pub struct ScrollVideo {
    store: SharedFrameStore,
    mapper: ScrollMapper,
    renderer: CanvasRenderer,
    /// Run allowed to report progress; 0 when none is.
    active_run: Arc<AtomicU64>,
    last_run: RunId,
    current: Option<ActiveRun>,
}

struct ActiveRun {
    id: RunId,
    token: CancellationToken,
}

impl ScrollVideo {
    /// Create an engine with an empty store and a canvas mounted on `surface`.
    pub fn new(surface: Surface) -> Self {
        Self {
            store: Arc::new(RwLock::new(FrameStore::new(0))),
            mapper: ScrollMapper::new(),
            renderer: CanvasRenderer::mount(surface),
            active_run: Arc::new(AtomicU64::new(RunId::NONE.get())),
            last_run: RunId::NONE,
            current: None,
        }
    }

    /// Start extracting a new source on a blocking worker thread.
    ///
    /// `open` runs on the worker as part of the run's probing phase, so a
    /// slow network open never blocks the caller. Any run still in flight is
    /// cancelled first and its frames discarded.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn load<F, D>(&mut self, open: F, options: ExtractOptions) -> RunHandle
    where
        F: FnOnce() -> Result<D, ScrollFrameError> + Send + 'static,
        D: FrameDecoder + 'static,
    {
        let (run, token, ledger, options) = self.begin_run(options);
        let store = Arc::clone(&self.store);
        let worker_token = token.clone();
        let worker_ledger = ledger.clone();

        let handle = tokio::task::spawn_blocking(move || {
            FrameExtraction::new(DeferredDecoder::<F, D>::new(open), &options)
                .with_run_id(run)
                .with_token(worker_token)
                .with_ledger(worker_ledger)
                .commit_into(&store)
        });

        RunHandle {
            run,
            token,
            ledger,
            handle,
        }
    }

    /// Run a whole extraction on the calling thread.
    ///
    /// # Errors
    ///
    /// The run-level error that made the run fail.
    pub fn load_blocking<D: FrameDecoder>(
        &mut self,
        decoder: D,
        options: ExtractOptions,
    ) -> Result<RunOutcome, ScrollFrameError> {
        let (run, token, ledger, options) = self.begin_run(options);
        let outcome = FrameExtraction::new(decoder, &options)
            .with_run_id(run)
            .with_token(token)
            .with_ledger(ledger)
            .commit_into(&self.store);
        self.refresh(true);
        outcome
    }

    /// Cancel the run in flight and release every stored frame.
    pub fn unload(&mut self) {
        if let Some(active) = self.current.take() {
            log::debug!("Unloading run {}", active.id);
            active.token.cancel();
        }
        self.active_run.store(RunId::NONE.get(), Ordering::Release);
        self.write_store().reset(RunId::NONE, 0);
        self.mapper.set_frame_count(0);
        self.renderer.reset();
    }

    /// Feed new scroll progress and draw the frame it selects.
    pub fn set_scroll_progress(&mut self, progress: f64) -> Option<usize> {
        self.mapper.set_progress(progress);
        self.refresh(false)
    }

    /// Feed a raw scroll offset measured against `region`.
    pub fn set_scroll_offset(&mut self, offset: f64, region: ScrollRegion) -> Option<usize> {
        self.set_scroll_progress(region.progress(offset))
    }

    /// Pick up frames committed since the last call and redraw if the
    /// selected index moved.
    pub fn tick(&mut self) -> Option<usize> {
        self.refresh(false)
    }

    /// Resize the canvas and redraw the frame that was on it.
    pub fn resize(&mut self, surface: Surface) -> bool {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        if store.is_empty() {
            self.renderer.reset();
        }
        self.renderer.resize(surface, &store)
    }

    pub fn canvas(&self) -> &RgbaImage {
        self.renderer.canvas()
    }

    pub fn renderer(&self) -> &CanvasRenderer {
        &self.renderer
    }

    /// Index of the frame on the canvas.
    pub fn current_index(&self) -> Option<usize> {
        self.renderer.last_index()
    }

    pub fn frame_count(&self) -> usize {
        self.store.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn store(&self) -> SharedFrameStore {
        Arc::clone(&self.store)
    }

    /// The run currently allowed to fill the store.
    pub fn active_run(&self) -> Option<RunId> {
        self.current.as_ref().map(|active| active.id)
    }

    fn begin_run(
        &mut self,
        options: ExtractOptions,
    ) -> (RunId, CancellationToken, FrameLedger, ExtractOptions) {
        if let Some(previous) = self.current.take() {
            log::debug!("Cancelling run {} for a new source", previous.id);
            previous.token.cancel();
        }

        let run = self.last_run.next();
        self.last_run = run;
        let token = CancellationToken::new();

        self.active_run.store(run.get(), Ordering::Release);
        self.write_store().reset(run, options.max_frames());
        self.mapper.set_frame_count(0);
        self.renderer.reset();

        let relay = ActiveRunProgress {
            inner: Arc::clone(&options.progress),
            active_run: Arc::clone(&self.active_run),
            run,
        };
        let options = options.with_progress(Arc::new(relay));

        self.current = Some(ActiveRun {
            id: run,
            token: token.clone(),
        });
        log::debug!("Starting run {run}");
        (run, token, FrameLedger::new(), options)
    }

    fn refresh(&mut self, force: bool) -> Option<usize> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = self.mapper.set_frame_count(store.len()) else {
            // A cancelled or failed run took its frames back.
            if self.renderer.last_index().is_some() {
                self.renderer.reset();
            }
            return None;
        };
        if force || self.renderer.last_index() != Some(index) {
            self.renderer.draw(&store, index);
        }
        Some(index)
    }

    fn write_store(&self) -> std::sync::RwLockWriteGuard<'_, FrameStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ScrollVideo {
    fn drop(&mut self) {
        if let Some(active) = self.current.take() {
            active.token.cancel();
        }
    }
}

/// Handle to a run started by [`ScrollVideo::load`].
///
/// Resolves once, with the run's outcome or the run-level error that ended
/// it. A superseded run resolves to an outcome in
/// [`RunState::Cancelled`](crate::RunState::Cancelled), not to an error, and
/// so does a worker the runtime aborted on shutdown.
///
/// # Panics
///
/// A panic on the worker thread (from a decoder, say) is resumed in the
/// task awaiting the handle.
pub struct RunHandle {
    run: RunId,
    token: CancellationToken,
    ledger: FrameLedger,
    handle: JoinHandle<Result<RunOutcome, ScrollFrameError>>,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run
    }

    /// Cancel this run. Its committed frames are released and the canvas
    /// blanks on the next scroll update. Has no effect once it has ended.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Release accounting for the frames this run produced.
    pub fn ledger(&self) -> &FrameLedger {
        &self.ledger
    }
}

impl Future for RunHandle {
    type Output = Result<RunOutcome, ScrollFrameError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let run = self.run;
        Pin::new(&mut self.handle).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(error) if error.is_panic() => panic::resume_unwind(error.into_panic()),
            Err(error) => {
                log::debug!("Run {run} worker aborted: {error}");
                Ok(RunOutcome::aborted(run))
            }
        })
    }
}

/// Forwards progress only while its run is the active one.
struct ActiveRunProgress {
    inner: Arc<dyn ProgressCallback>,
    active_run: Arc<AtomicU64>,
    run: RunId,
}

impl ProgressCallback for ActiveRunProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if self.active_run.load(Ordering::Acquire) == self.run.get() {
            self.inner.on_progress(info);
        }
    }
}
