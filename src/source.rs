//! Video source loading.
//!
//! [`VideoSource`] opens a local path or a network URL through FFmpeg,
//! selects the best video stream, checks that a decoder exists for its
//! codec, and caches the stream metadata.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    time::Duration,
};

use ffmpeg_next::{
    Rational, codec::context::Context as CodecContext, decoder::Video as VideoDecoder,
    format::context::Input, media::Type,
};

use crate::{error::ScrollFrameError, metadata::VideoMetadata, utilities};

/// An opened video resource, ready for decoding.
///
/// # Example
///
/// ```no_run
/// use scrollframe::VideoSource;
///
/// let source = VideoSource::open("https://example.com/hero.mp4")?;
/// println!("{:?}", source.metadata().duration);
/// # Ok::<(), scrollframe::ScrollFrameError>(())
/// ```
pub struct VideoSource {
    locator: String,
    pub(crate) input: Input,
    pub(crate) decoder: VideoDecoder,
    pub(crate) stream_index: usize,
    pub(crate) time_base: Rational,
    /// Stream start offset in seconds; timestamps are measured from it.
    pub(crate) start_seconds: f64,
    metadata: VideoMetadata,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("locator", &self.locator)
            .field("stream_index", &self.stream_index)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a path or URL.
    ///
    /// Locators containing `://` are treated as network resources and
    /// FFmpeg's network layer is initialised first.
    ///
    /// # Errors
    ///
    /// - [`ScrollFrameError::SourceUnavailable`] if the resource cannot be
    ///   fetched or demuxed.
    /// - [`ScrollFrameError::NoVideoStream`] if it carries no video.
    /// - [`ScrollFrameError::UnsupportedCodec`] if no decoder is available.
    pub fn open(locator: impl Into<String>) -> Result<Self, ScrollFrameError> {
        let locator = locator.into();
        log::debug!("Opening video source: {locator}");

        let unavailable = |reason: String| ScrollFrameError::SourceUnavailable {
            locator: locator.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| unavailable(format!("FFmpeg initialisation failed: {error}")))?;
        if locator.contains("://") {
            ffmpeg_next::format::network::init();
        }

        let input = ffmpeg_next::format::input(&locator)
            .map_err(|error| unavailable(error.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(ScrollFrameError::NoVideoStream)?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let codec_name = stream.parameters().id().name().to_string();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| {
                log::debug!("No decoder for {codec_name}: {error}");
                ScrollFrameError::UnsupportedCodec(codec_name.clone())
            })?;

        let mut frames_per_second = utilities::rational_to_fps(stream.avg_frame_rate());
        if frames_per_second <= 0.0 {
            frames_per_second = utilities::rational_to_fps(stream.rate());
        }

        let start_time = stream.start_time();
        let start_seconds = if start_time > 0 {
            utilities::pts_to_seconds(start_time, time_base)
        } else {
            0.0
        };

        let duration = if input.duration() > 0 {
            Duration::from_micros(input.duration() as u64)
        } else if stream.duration() > 0 {
            Duration::from_secs_f64(utilities::pts_to_seconds(stream.duration(), time_base))
        } else {
            Duration::ZERO
        };

        let frame_count = if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let metadata = VideoMetadata {
            duration,
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            codec: codec_name,
        };

        log::debug!(
            "Probed {locator}: {}x{} @ {:.3} fps, {:?}",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.duration,
        );

        Ok(Self {
            locator,
            input,
            decoder,
            stream_index,
            time_base,
            start_seconds,
            metadata,
        })
    }

    /// Open a source, read its metadata, and close it again.
    ///
    /// # Errors
    ///
    /// Same as [`open`](VideoSource::open).
    pub fn probe(locator: impl Into<String>) -> Result<VideoMetadata, ScrollFrameError> {
        Ok(Self::open(locator)?.metadata)
    }

    /// The path or URL this source was opened from.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }
}
