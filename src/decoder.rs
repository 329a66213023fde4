//! Frame decoding strategies.
//!
//! The extraction run talks to a [`FrameDecoder`]: something that can report
//! the metadata of its source and turn a sample timestamp into an RGBA
//! raster fitted to the configured bounds. [`FfmpegDecoder`] is the
//! production implementation; it reaches each timestamp either by seeking
//! ([`DecodeStrategy::Seek`]) or by decoding the stream once from front to
//! back ([`DecodeStrategy::Sequential`]).

use std::time::Duration;

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbaImage;

use crate::{
    configuration::FrameBounds, error::ScrollFrameError, metadata::VideoMetadata,
    sampler::SampleTimestamp, source::VideoSource, utilities,
};

/// How a decoder positions itself at each sample timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeStrategy {
    /// Seek to the keyframe before every timestamp, then decode forward.
    ///
    /// Best when samples are sparse compared to the keyframe interval.
    #[default]
    Seek,
    /// Decode the stream once, front to back, keeping the first frame at or
    /// after each timestamp.
    ///
    /// Best for short clips or dense sampling. Only seeks when asked for a
    /// timestamp behind the current position.
    Sequential,
}

/// A source of decoded frames for an extraction run.
///
/// Implementations do not need to be [`Send`]: the engine constructs the
/// decoder on the worker thread that uses it.
pub trait FrameDecoder {
    /// Report the source metadata. Called once, before any decode.
    ///
    /// # Errors
    ///
    /// A run-fatal error when the source cannot be described.
    fn probe(&mut self) -> Result<VideoMetadata, ScrollFrameError>;

    /// Decode the frame shown at `timestamp` into a raster fitted to
    /// `bounds` with [`FrameBounds::fit`].
    ///
    /// # Errors
    ///
    /// A per-frame error skips this sample; a run-fatal one ends the run.
    fn decode_at(
        &mut self,
        timestamp: SampleTimestamp,
        bounds: FrameBounds,
    ) -> Result<RgbaImage, ScrollFrameError>;
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for Box<D> {
    fn probe(&mut self) -> Result<VideoMetadata, ScrollFrameError> {
        (**self).probe()
    }

    fn decode_at(
        &mut self,
        timestamp: SampleTimestamp,
        bounds: FrameBounds,
    ) -> Result<RgbaImage, ScrollFrameError> {
        (**self).decode_at(timestamp, bounds)
    }
}

/// FFmpeg-backed [`FrameDecoder`].
///
/// # Example
///
/// ```no_run
/// use scrollframe::{DecodeStrategy, FfmpegDecoder, FrameBounds, FrameDecoder, SampleTimestamp};
/// use std::time::Duration;
///
/// let mut decoder = FfmpegDecoder::open("intro.mp4", DecodeStrategy::Seek)?;
/// let raster = decoder.decode_at(
///     SampleTimestamp::new(Duration::from_secs(2)),
///     FrameBounds::default(),
/// )?;
/// raster.save("two_seconds.png")?;
/// # Ok::<(), scrollframe::ScrollFrameError>(())
/// ```
pub struct FfmpegDecoder {
    source: VideoSource,
    strategy: DecodeStrategy,
    /// Source time of the most recently decoded frame, in seconds.
    position: Option<f64>,
    /// Most recently accepted frame, reused when two samples land on it.
    last_frame: Option<(f64, VideoFrame)>,
    /// EOF has been sent to the decoder since the last seek.
    drained: bool,
}

impl FfmpegDecoder {
    /// Open `locator` and prepare to decode it with `strategy`.
    ///
    /// # Errors
    ///
    /// Any error from [`VideoSource::open`].
    pub fn open(locator: impl Into<String>, strategy: DecodeStrategy) -> Result<Self, ScrollFrameError> {
        Ok(Self::from_source(VideoSource::open(locator)?, strategy))
    }

    pub fn from_source(source: VideoSource, strategy: DecodeStrategy) -> Self {
        Self {
            source,
            strategy,
            position: None,
            last_frame: None,
            drained: false,
        }
    }

    pub fn source(&self) -> &VideoSource {
        &self.source
    }

    /// Half the nominal frame interval, used to accept the frame nearest a
    /// timestamp rather than strictly the one after it.
    fn tolerance(&self) -> f64 {
        let fps = self.source.metadata().frames_per_second;
        if fps > 0.0 { 0.5 / fps } else { 0.0 }
    }

    fn seek(&mut self, target: f64) {
        let untouched = self.position.is_none() && !self.drained;
        self.position = None;
        self.last_frame = None;

        // A fresh demuxer already sits at the start.
        if target <= 0.0 && untouched {
            return;
        }

        let offset = Duration::from_secs_f64(target.max(0.0) + self.source.start_seconds);
        let seek_timestamp = utilities::duration_to_seek_timestamp(offset);
        match self.source.input.seek(seek_timestamp, ..=seek_timestamp) {
            Ok(()) => {
                self.source.decoder.flush();
                self.drained = false;
            }
            Err(error) => {
                log::warn!(
                    "Seek to {target:.3}s failed ({error}); decoding from current position"
                );
            }
        }
    }

    fn next_video_packet(&mut self) -> Option<ffmpeg_next::Packet> {
        let stream_index = self.source.stream_index;
        self.source
            .input
            .packets()
            .find_map(|(stream, packet)| (stream.index() == stream_index).then_some(packet))
    }

    fn frame_seconds(&self, frame: &VideoFrame) -> f64 {
        match frame.timestamp().or_else(|| frame.pts()) {
            Some(pts) => {
                utilities::pts_to_seconds(pts, self.source.time_base) - self.source.start_seconds
            }
            None => self.position.map_or(0.0, |position| position + 2.0 * self.tolerance()),
        }
    }

    /// Decode forward until a frame at or after `threshold` seconds is
    /// available in `last_frame`.
    fn decode_until(&mut self, threshold: f64, timestamp: SampleTimestamp) -> Result<(), ScrollFrameError> {
        let mut decoded = VideoFrame::empty();
        loop {
            while self.source.decoder.receive_frame(&mut decoded).is_ok() {
                let seconds = self.frame_seconds(&decoded);
                self.position = Some(seconds);
                if seconds >= threshold {
                    self.last_frame = Some((seconds, decoded));
                    return Ok(());
                }
            }

            if self.drained {
                return Err(ScrollFrameError::EndOfStream(timestamp.offset()));
            }

            match self.next_video_packet() {
                Some(packet) => self.source.decoder.send_packet(&packet).map_err(|error| {
                    ScrollFrameError::FrameDecode(format!(
                        "packet rejected near {:.3}s: {error}",
                        timestamp.as_secs_f64()
                    ))
                })?,
                None => {
                    self.source.decoder.send_eof()?;
                    self.drained = true;
                }
            }
        }
    }

    fn rasterize(frame: &VideoFrame, bounds: FrameBounds) -> Result<RgbaImage, ScrollFrameError> {
        let (width, height) = bounds.fit(frame.width(), frame.height());
        let mut scaler = ScalingContext::get(
            frame.format(),
            frame.width(),
            frame.height(),
            Pixel::RGBA,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let mut rgba_frame = VideoFrame::empty();
        scaler.run(frame, &mut rgba_frame)?;

        let buffer = utilities::frame_to_rgba_buffer(&rgba_frame, width, height);
        RgbaImage::from_raw(width, height, buffer).ok_or_else(|| {
            ScrollFrameError::FrameDecode("scaled frame has an unexpected buffer size".to_string())
        })
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn probe(&mut self) -> Result<VideoMetadata, ScrollFrameError> {
        Ok(self.source.metadata().clone())
    }

    fn decode_at(
        &mut self,
        timestamp: SampleTimestamp,
        bounds: FrameBounds,
    ) -> Result<RgbaImage, ScrollFrameError> {
        let target = timestamp.as_secs_f64();
        let threshold = target - self.tolerance();

        if let Some((seconds, frame)) = &self.last_frame {
            if *seconds >= threshold && *seconds <= target + self.tolerance() {
                return Self::rasterize(frame, bounds);
            }
        }

        let needs_seek = match self.strategy {
            DecodeStrategy::Seek => true,
            DecodeStrategy::Sequential => self.position.is_some_and(|position| position > target),
        };
        if needs_seek {
            self.seek(target);
        }

        self.decode_until(threshold, timestamp)?;
        match &self.last_frame {
            Some((_, frame)) => Self::rasterize(frame, bounds),
            None => Err(ScrollFrameError::EndOfStream(timestamp.offset())),
        }
    }
}

/// Opens its source on the first probe, on whichever thread runs it.
pub(crate) enum DeferredDecoder<F, D> {
    Pending(Option<F>),
    Ready(D),
}

impl<F, D> DeferredDecoder<F, D> {
    pub(crate) fn new(open: F) -> Self {
        DeferredDecoder::Pending(Some(open))
    }
}

impl<F, D> FrameDecoder for DeferredDecoder<F, D>
where
    F: FnOnce() -> Result<D, ScrollFrameError>,
    D: FrameDecoder,
{
    fn probe(&mut self) -> Result<VideoMetadata, ScrollFrameError> {
        if let DeferredDecoder::Pending(open) = self {
            let open = open.take().ok_or(ScrollFrameError::Cancelled)?;
            *self = DeferredDecoder::Ready(open()?);
        }
        match self {
            DeferredDecoder::Ready(decoder) => decoder.probe(),
            DeferredDecoder::Pending(_) => Err(ScrollFrameError::Cancelled),
        }
    }

    fn decode_at(
        &mut self,
        timestamp: SampleTimestamp,
        bounds: FrameBounds,
    ) -> Result<RgbaImage, ScrollFrameError> {
        match self {
            DeferredDecoder::Ready(decoder) => decoder.decode_at(timestamp, bounds),
            DeferredDecoder::Pending(_) => Err(ScrollFrameError::FrameDecode(
                "decode requested before the source was opened".to_string(),
            )),
        }
    }
}
