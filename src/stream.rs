//! Async streaming of extraction runs.
//!
//! [`FrameStream`] runs a [`FrameExtraction`] on a blocking thread and hands
//! its frames back through a bounded channel, so a Tokio task can consume
//! them with [`StreamExt`](tokio_stream::StreamExt) without tying up the
//! runtime with FFmpeg work.
//!
//! # Example
//!
//! ```no_run
//! use tokio_stream::StreamExt;
//!
//! use scrollframe::{ExtractOptions, FfmpegDecoder, FrameStream, ScrollFrameError};
//!
//! # async fn example() -> Result<(), ScrollFrameError> {
//! let options = ExtractOptions::new().with_max_frames(24);
//! let strategy = options.strategy();
//! let mut stream = FrameStream::spawn(move || FfmpegDecoder::open("intro.mp4", strategy), options);
//!
//! while let Some(frame) = stream.next().await {
//!     let frame = frame?;
//!     frame.image().save(format!("frame_{:03}.png", frame.sample_index()))?;
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::{sync::mpsc::Receiver, task::JoinHandle};
use tokio_stream::Stream;

use crate::{
    configuration::ExtractOptions,
    decoder::{DeferredDecoder, FrameDecoder},
    error::ScrollFrameError,
    extraction::FrameExtraction,
    frame::{DecodedFrame, FrameLedger},
    progress::CancellationToken,
};

/// Default bounded-channel capacity for [`FrameStream`].
///
/// Kept small so a slow consumer holds back the decoder instead of letting
/// full-resolution rasters pile up.
const DEFAULT_CHANNEL_CAPACITY: usize = 4;

/// A stream of decoded frames produced by a background extraction run.
///
/// Dropping the stream cancels the run; it stops at the next sample
/// boundary and every frame still in the channel is released.
pub struct FrameStream {
    receiver: Receiver<Result<DecodedFrame, ScrollFrameError>>,
    token: CancellationToken,
    ledger: FrameLedger,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl FrameStream {
    /// Start a run over the decoder `open` returns, with the default
    /// channel capacity.
    ///
    /// `open` runs on the blocking thread. Must be called from within a
    /// Tokio runtime.
    pub fn spawn<F, D>(open: F, options: ExtractOptions) -> Self
    where
        F: FnOnce() -> Result<D, ScrollFrameError> + Send + 'static,
        D: FrameDecoder + 'static,
    {
        Self::with_capacity(open, options, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Like [`spawn`](Self::spawn) with an explicit channel capacity
    /// (at least 1).
    pub fn with_capacity<F, D>(open: F, options: ExtractOptions, capacity: usize) -> Self
    where
        F: FnOnce() -> Result<D, ScrollFrameError> + Send + 'static,
        D: FrameDecoder + 'static,
    {
        let (sender, receiver) = tokio::sync::mpsc::channel(capacity.max(1));
        let token = CancellationToken::new();
        let ledger = FrameLedger::new();
        let worker_token = token.clone();
        let worker_ledger = ledger.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let extraction = FrameExtraction::new(DeferredDecoder::<F, D>::new(open), &options)
                .with_token(worker_token)
                .with_ledger(worker_ledger);

            for item in extraction {
                if sender.blocking_send(item).is_err() {
                    log::debug!("Frame stream receiver dropped; stopping run");
                    break;
                }
            }
        });

        Self {
            receiver,
            token,
            ledger,
            handle,
        }
    }

    /// Stop the run. Frames already in the channel are still delivered.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Release accounting for the frames this stream's run produced.
    pub fn ledger(&self) -> &FrameLedger {
        &self.ledger
    }
}

impl Stream for FrameStream {
    type Item = Result<DecodedFrame, ScrollFrameError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
