//! Sequential frame decoding.
//!
//! [`FrameSource`] opens a video with FFmpeg, picks its best video stream and
//! yields every frame in decode order as an [`RgbImage`], numbered from zero.
//! Frame `n` is shown at `n / fps` seconds, which is the clock the overlay
//! pipeline matches subtitle cues against.
//!
//! # Example
//!
//! ```no_run
//! use subplace::FrameSource;
//!
//! let source = FrameSource::open("input.mp4")?;
//! println!("{}x{} at {:.2} fps", source.info().width, source.info().height, source.info().frames_per_second);
//!
//! for frame in source {
//!     let (number, image) = frame?;
//!     image.save(format!("frame_{number}.png"))?;
//! }
//! # Ok::<(), subplace::SubplaceError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;
use serde::Serialize;

use crate::error::SubplaceError;
use crate::utilities;

/// Properties of the decoded video stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Average frame rate of the stream.
    pub frames_per_second: f64,
    /// Estimated from the container duration; zero when unknown.
    pub frame_count: u64,
    pub duration: Duration,
}

/// Decodes a video file frame by frame.
pub struct FrameSource {
    path: PathBuf,
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    info: VideoInfo,
    decoded: VideoFrame,
    converted: VideoFrame,
    next_frame: u64,
    eof_sent: bool,
    done: bool,
}

impl FrameSource {
    /// Open `path` and prepare its best video stream for decoding.
    ///
    /// # Errors
    ///
    /// - [`SubplaceError::FileOpen`] if the file cannot be opened, its codec
    ///   is unsupported, or it has no usable frame rate.
    /// - [`SubplaceError::NoVideoStream`] if the file has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SubplaceError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video {}", path.display());

        let open_error = |reason: String| SubplaceError::FileOpen {
            path: path.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let (stream_index, frames_per_second, decoder) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or(SubplaceError::NoVideoStream)?;

            let frames_per_second = rate_to_fps(stream.avg_frame_rate())
                .or_else(|| rate_to_fps(stream.rate()))
                .ok_or_else(|| open_error("video stream has no frame rate".to_string()))?;

            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| open_error(format!("cannot create video decoder: {error}")))?;

            (stream.index(), frames_per_second, decoder)
        };

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| open_error(format!("cannot create scaler: {error}")))?;

        let duration = match input.duration() {
            micros if micros > 0 => Duration::from_micros(micros as u64),
            _ => Duration::ZERO,
        };
        let info = VideoInfo {
            width,
            height,
            frames_per_second,
            frame_count: (duration.as_secs_f64() * frames_per_second) as u64,
            duration,
        };

        log::info!(
            "Opened {}: {}x{} at {:.3} fps, ~{} frames",
            path.display(),
            info.width,
            info.height,
            info.frames_per_second,
            info.frame_count,
        );

        Ok(Self {
            path,
            input,
            decoder,
            scaler,
            stream_index,
            info,
            decoded: VideoFrame::empty(),
            converted: VideoFrame::empty(),
            next_frame: 0,
            eof_sent: false,
            done: false,
        })
    }

    /// Stream properties.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// The file being decoded.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn convert_current(&mut self) -> Result<RgbImage, SubplaceError> {
        self.scaler.run(&self.decoded, &mut self.converted)?;

        let (width, height) = (self.info.width, self.info.height);
        let buffer = utilities::frame_to_rgb_buffer(&self.converted, width, height);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            SubplaceError::VideoDecodeError(format!(
                "decoded frame {} does not fill a {width}x{height} RGB image",
                self.next_frame
            ))
        })
    }
}

impl Iterator for FrameSource {
    type Item = Result<(u64, RgbImage), SubplaceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded).is_ok() {
                let number = self.next_frame;
                return match self.convert_current() {
                    Ok(image) => {
                        self.next_frame += 1;
                        Some(Ok((number, image)))
                    }
                    Err(error) => {
                        self.done = true;
                        Some(Err(error))
                    }
                };
            }

            if self.eof_sent {
                log::debug!("Decoded {} frame(s) from {}", self.next_frame, self.path.display());
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            self.done = true;
                            return Some(Err(SubplaceError::VideoDecodeError(error.to_string())));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(SubplaceError::from(error)));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::trace!("Skipping unreadable packet: {error}");
                }
            }
        }
    }
}

fn rate_to_fps(rate: ffmpeg_next::Rational) -> Option<f64> {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    } else {
        None
    }
}
