//! Synthetic decoders shared by the integration tests.
//!
//! Frames are solid colours: red and green carry the sample timestamp in
//! centiseconds, blue carries the decoder's tag, so a test can tell which
//! source and which sample ended up on a canvas.

#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{Mutex, mpsc::Receiver},
    time::Duration,
};

use image::{Rgba, RgbaImage};
use scrollframe::{
    FrameBounds, FrameDecoder, ProgressCallback, ProgressInfo, RunId, SampleTimestamp,
    ScrollFrameError, VideoMetadata,
};

pub struct SyntheticDecoder {
    metadata: VideoMetadata,
    tag: u8,
    failing: HashSet<usize>,
    fatal_at: Option<usize>,
    panic_at: Option<usize>,
    probe_error: bool,
    gate: Option<Receiver<()>>,
    calls: usize,
}

impl SyntheticDecoder {
    pub fn new(duration: Duration, width: u32, height: u32) -> Self {
        Self {
            metadata: VideoMetadata {
                duration,
                width,
                height,
                frames_per_second: 30.0,
                frame_count: (duration.as_secs_f64() * 30.0) as u64,
                codec: "synthetic".to_string(),
            },
            tag: 0,
            failing: HashSet::new(),
            fatal_at: None,
            panic_at: None,
            probe_error: false,
            gate: None,
            calls: 0,
        }
    }

    /// Value written to the blue channel of every frame.
    pub fn tagged(mut self, tag: u8) -> Self {
        self.tag = tag;
        self
    }

    /// Make the decode of these sample positions fail with a per-frame error.
    pub fn failing(mut self, samples: &[usize]) -> Self {
        self.failing.extend(samples.iter().copied());
        self
    }

    /// Make the decode of this sample position fail the whole run.
    pub fn fatal_at(mut self, sample: usize) -> Self {
        self.fatal_at = Some(sample);
        self
    }

    /// Panic inside the decode of this sample position.
    pub fn panicking_at(mut self, sample: usize) -> Self {
        self.panic_at = Some(sample);
        self
    }

    /// Make the probe fail as if the source could not be opened.
    pub fn unavailable(mut self) -> Self {
        self.probe_error = true;
        self
    }

    /// Block every decode until a message arrives on `gate`.
    pub fn gated(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Timestamp in centiseconds packed into the red and green channels.
pub fn timestamp_code(pixel: &Rgba<u8>) -> u16 {
    u16::from(pixel[0]) << 8 | u16::from(pixel[1])
}

pub fn encode_timestamp(timestamp: SampleTimestamp) -> u16 {
    (timestamp.offset().as_millis() / 10) as u16
}

impl FrameDecoder for SyntheticDecoder {
    fn probe(&mut self) -> Result<VideoMetadata, ScrollFrameError> {
        if self.probe_error {
            return Err(ScrollFrameError::SourceUnavailable {
                locator: "synthetic://missing".to_string(),
                reason: "no such source".to_string(),
            });
        }
        Ok(self.metadata.clone())
    }

    fn decode_at(
        &mut self,
        timestamp: SampleTimestamp,
        bounds: FrameBounds,
    ) -> Result<RgbaImage, ScrollFrameError> {
        let call = self.calls;
        self.calls += 1;

        if let Some(gate) = &self.gate {
            gate.recv().map_err(|_| ScrollFrameError::Cancelled)?;
        }
        if self.panic_at == Some(call) {
            panic!("synthetic decoder gave up at sample {call}");
        }
        if self.fatal_at == Some(call) {
            return Err(ScrollFrameError::UnsupportedCodec("synthetic".to_string()));
        }
        if self.failing.contains(&call) {
            return Err(ScrollFrameError::FrameDecode(format!("corrupt sample {call}")));
        }

        let (width, height) = bounds.fit(self.metadata.width, self.metadata.height);
        let code = encode_timestamp(timestamp);
        let pixel = Rgba([(code >> 8) as u8, code as u8, self.tag, 255]);
        Ok(RgbaImage::from_pixel(width, height, pixel))
    }
}

/// Records every progress report in order.
#[derive(Default)]
pub struct RecordingProgress {
    pub reports: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    pub fn percents(&self) -> Vec<u8> {
        self.reports.lock().unwrap().iter().map(|info| info.percent).collect()
    }

    pub fn percents_for(&self, run: RunId) -> Vec<u8> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .filter(|info| info.run == run)
            .map(|info| info.percent)
            .collect()
    }

    pub fn runs(&self) -> Vec<RunId> {
        self.reports.lock().unwrap().iter().map(|info| info.run).collect()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.reports.lock().unwrap().push(info.clone());
    }
}

/// Percentages must never decrease before the terminal report.
pub fn assert_monotonic_until_terminal(percents: &[u8]) {
    let (_, running) = percents.split_last().expect("at least one report");
    for pair in running.windows(2) {
        assert!(pair[0] <= pair[1], "progress went backwards: {percents:?}");
    }
    assert!(running.iter().all(|&percent| percent <= 99), "{percents:?}");
}
