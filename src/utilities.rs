//! Internal helpers shared by the FFmpeg decode path.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy an RGBA plane out of an FFmpeg frame, dropping per-row padding.
pub(crate) fn frame_to_rgba_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * 4;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}

/// Seek target in AV_TIME_BASE units (microseconds) for container seeks.
pub(crate) fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    duration.as_micros() as i64
}

/// Rescale a stream PTS to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Frames per second from an FFmpeg rational, 0.0 when undefined.
pub(crate) fn rational_to_fps(rate: Rational) -> f64 {
    if rate.denominator() == 0 {
        0.0
    } else {
        rate.numerator() as f64 / rate.denominator() as f64
    }
}
