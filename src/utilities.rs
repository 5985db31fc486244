//! Internal helpers shared by the decoding and encoding sides.

use std::time::Duration;

use ffmpeg_next::frame::Video as VideoFrame;

/// Copy an RGB24 FFmpeg frame into a tightly packed buffer.
///
/// FFmpeg rows frequently carry padding (stride > width × 3); the result can
/// be passed straight to [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Copy a packed RGB buffer into an RGB24 FFmpeg frame, honouring its stride.
pub(crate) fn rgb_buffer_to_frame(rgb: &[u8], video_frame: &mut VideoFrame, width: u32, height: u32) {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * 3;
    let data = video_frame.data_mut(0);

    for row in 0..(height as usize) {
        let source = row * row_length;
        let destination = row * stride;
        data[destination..destination + row_length]
            .copy_from_slice(&rgb[source..source + row_length]);
    }
}

/// Presentation time of frame `frame_number` at a constant frame rate.
pub fn frame_time_seconds(frame_number: u64, frames_per_second: f64) -> f64 {
    if frames_per_second > 0.0 {
        frame_number as f64 / frames_per_second
    } else {
        0.0
    }
}

/// [`frame_time_seconds`] as a [`Duration`].
pub fn frame_timestamp(frame_number: u64, frames_per_second: f64) -> Duration {
    Duration::from_secs_f64(frame_time_seconds(frame_number, frames_per_second))
}
