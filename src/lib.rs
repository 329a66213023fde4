//! # scrollframe
//!
//! Scroll-driven video playback: sample a video into a fixed budget of
//! decoded frames, then map a scroll position onto those frames and draw the
//! selected one onto a DPR-aware canvas.
//!
//! Decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate; frames and the
//! canvas are [`image::RgbaImage`] buffers.
//!
//! ## Quick Start
//!
//! ### Drive a canvas from scroll position
//!
//! ```no_run
//! use scrollframe::{ExtractOptions, FfmpegDecoder, ScrollVideo, Surface};
//!
//! # async fn example() -> Result<(), scrollframe::ScrollFrameError> {
//! let mut video = ScrollVideo::new(Surface::new(1280.0, 720.0, 2.0));
//! let options = ExtractOptions::new();
//! let strategy = options.strategy();
//!
//! video
//!     .load(move || FfmpegDecoder::open("hero.mp4", strategy), options)
//!     .await?;
//!
//! video.set_scroll_progress(0.5);
//! video.canvas().save("halfway.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Extract the sampled frames
//!
//! ```no_run
//! use scrollframe::{ExtractOptions, FfmpegDecoder, extract};
//!
//! let options = ExtractOptions::new().with_max_frames(12);
//! let decoder = FfmpegDecoder::open("input.mp4", options.strategy())?;
//!
//! for frame in extract(decoder, &options) {
//!     let frame = frame?;
//!     frame.image().save(format!("frame_{:02}.png", frame.sample_index()))?;
//! }
//! # Ok::<(), scrollframe::ScrollFrameError>(())
//! ```
//!
//! ### Map scroll progress to a frame
//!
//! ```
//! use scrollframe::{ScrollRegion, frame_index};
//!
//! let region = ScrollRegion::new(0.0, 4000.0);
//! let progress = region.progress(1000.0);
//! assert_eq!(frame_index(progress, 60), Some(15));
//! ```
//!
//! ## Features
//!
//! - **Temporal sampling**: at most `max_frames` timestamps spread evenly
//!   over the source at a nominal base rate
//! - **Two decode strategies**: seek per sample, or one sequential pass
//! - **Bounded rasters**: frames fitted inside max width/height, never
//!   upscaled
//! - **Cancellable runs**: loading a new source cancels the run in flight;
//!   its frames never reach the new store and are all released
//! - **Load progress**: monotonic percentage, 100 only on completion
//! - **Cover rendering**: top-anchored cover fit onto a device-pixel-ratio
//!   scaled canvas, redrawn on resize
//! - **Async**: runs on Tokio blocking threads, awaited through
//!   [`RunHandle`] or consumed as a [`FrameStream`]
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
pub mod decoder;
pub mod error;
pub mod extraction;
pub mod ffmpeg;
pub mod frame;
pub mod mapper;
pub mod metadata;
pub mod player;
pub mod progress;
pub mod renderer;
pub mod sampler;
pub mod source;
pub mod store;
pub mod stream;
mod utilities;

pub use configuration::{ExtractOptions, FrameBounds};
pub use decoder::{DecodeStrategy, FfmpegDecoder, FrameDecoder};
pub use error::ScrollFrameError;
pub use extraction::{FrameExtraction, RunId, RunOutcome, RunState, extract};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use frame::{DecodedFrame, FrameLedger};
pub use mapper::{ScrollMapper, ScrollRegion, frame_index};
pub use metadata::VideoMetadata;
pub use player::{RunHandle, ScrollVideo};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo, loading_percent};
pub use renderer::{CanvasRenderer, CoverFit, Surface, cover_fit};
pub use sampler::{SampleTimestamp, sample_timestamps};
pub use source::VideoSource;
pub use store::{CommitOutcome, FrameStore, SharedFrameStore};
pub use stream::FrameStream;
