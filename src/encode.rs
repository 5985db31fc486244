//! Streaming video encoder for composited frames.
//!
//! [`VideoWriter`] accepts frames one at a time, so the overlay pipeline
//! never holds more than the current frame in memory. The container format
//! is inferred from the output file extension.
//!
//! # Example
//!
//! ```no_run
//! use image::RgbImage;
//! use subplace::{VideoWriter, VideoWriterOptions};
//!
//! let mut writer = VideoWriter::create("output.mp4", 25.0, 640, 360, &VideoWriterOptions::default())?;
//! for _ in 0..50 {
//!     writer.write_frame(&RgbImage::new(640, 360))?;
//! }
//! writer.finish()?;
//! # Ok::<(), subplace::SubplaceError>(())
//! ```

use std::path::Path;

use ffmpeg_next::codec::Id;
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::encoder::Video as VideoEncoder;
use ffmpeg_next::format::context::Output;
use ffmpeg_next::format::{Flags as FormatFlags, Pixel};
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::{Dictionary, Packet, Rational};
use image::RgbImage;
use image::imageops::{self, FilterType};

use crate::error::SubplaceError;
use crate::utilities;

/// Output codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// H.264 / AVC.
    #[default]
    H264,
    /// H.265 / HEVC.
    H265,
    /// MPEG-4 Part 2, for AVI and builds without an H.264 encoder.
    Mpeg4,
}

impl VideoCodec {
    fn to_codec_id(self) -> Id {
        match self {
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
            VideoCodec::Mpeg4 => Id::MPEG4,
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone)]
pub struct VideoWriterOptions {
    pub codec: VideoCodec,
    /// Constant Rate Factor (0-51, lower is better). Ignored by codecs without CRF.
    pub crf: Option<u32>,
    /// Target bitrate in bits per second.
    pub bitrate: Option<usize>,
}

impl Default for VideoWriterOptions {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            crf: Some(23),
            bitrate: None,
        }
    }
}

impl VideoWriterOptions {
    #[must_use]
    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    #[must_use]
    pub fn with_bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = Some(bitrate);
        self
    }
}

/// Encodes RGB frames into a video file.
///
/// Call [`finish`](VideoWriter::finish) once all frames are written; a
/// writer dropped without finishing leaves a truncated file.
pub struct VideoWriter {
    output: Output,
    encoder: VideoEncoder,
    scaler: ScalingContext,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    frames_written: i64,
}

impl VideoWriter {
    /// Create `path` and write the container header.
    ///
    /// # Errors
    ///
    /// Returns [`SubplaceError::VideoEncodeError`] if the file, codec or
    /// scaler cannot be set up.
    pub fn create<P: AsRef<Path>>(
        path: P,
        frames_per_second: f64,
        width: u32,
        height: u32,
        options: &VideoWriterOptions,
    ) -> Result<Self, SubplaceError> {
        let path = path.as_ref();
        let encode_error = |what: &str, error: ffmpeg_next::Error| {
            SubplaceError::VideoEncodeError(format!("{what}: {error}"))
        };

        if !(frames_per_second > 0.0) || width == 0 || height == 0 {
            return Err(SubplaceError::VideoEncodeError(format!(
                "cannot encode {width}x{height} at {frames_per_second} fps"
            )));
        }

        log::info!(
            "Writing {} ({:?}, {}x{} at {:.3} fps)",
            path.display(),
            options.codec,
            width,
            height,
            frames_per_second,
        );

        ffmpeg_next::init().map_err(|error| encode_error("FFmpeg initialisation failed", error))?;

        let mut output = ffmpeg_next::format::output(&path)
            .map_err(|error| encode_error("cannot open output", error))?;
        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let codec_id = options.codec.to_codec_id();
        let codec = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
            SubplaceError::VideoEncodeError(format!("codec {codec_id:?} not available"))
        })?;

        let frame_rate = Rational::from(frames_per_second);
        let encoder_time_base = frame_rate.invert();

        let (stream_index, encoder) = {
            let mut stream = output
                .add_stream(codec)
                .map_err(|error| encode_error("cannot add stream", error))?;

            let mut encoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.encoder().video())
                .map_err(|error| encode_error("cannot create video encoder", error))?;

            encoder.set_width(width);
            encoder.set_height(height);
            encoder.set_format(Pixel::YUV420P);
            encoder.set_time_base(encoder_time_base);
            encoder.set_frame_rate(Some(frame_rate));
            if let Some(bitrate) = options.bitrate {
                encoder.set_bit_rate(bitrate);
            }
            if needs_global_header {
                unsafe {
                    (*encoder.as_mut_ptr()).flags |=
                        ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
                }
            }

            let mut codec_options = Dictionary::new();
            if let Some(crf) = options.crf {
                if matches!(options.codec, VideoCodec::H264 | VideoCodec::H265) {
                    codec_options.set("crf", &crf.to_string());
                }
            }

            let encoder = encoder
                .open_as_with(codec, codec_options)
                .map_err(|error| encode_error("cannot open encoder", error))?;
            stream.set_parameters(&encoder);
            stream.set_time_base(encoder_time_base);

            (stream.index(), encoder)
        };

        output
            .write_header()
            .map_err(|error| encode_error("cannot write header", error))?;

        // The muxer may pick its own time base while writing the header.
        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| SubplaceError::VideoEncodeError("output stream vanished".to_string()))?;

        let scaler = ScalingContext::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| encode_error("cannot create scaler", error))?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width,
            height,
            frames_written: 0,
        })
    }

    /// Encode one frame. Frames of another size are resized to fit.
    ///
    /// # Errors
    ///
    /// Returns [`SubplaceError::VideoEncodeError`] if encoding or muxing fails.
    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<(), SubplaceError> {
        let resized;
        let frame = if frame.dimensions() != (self.width, self.height) {
            resized = imageops::resize(frame, self.width, self.height, FilterType::Triangle);
            &resized
        } else {
            frame
        };

        let mut source = VideoFrame::new(Pixel::RGB24, self.width, self.height);
        utilities::rgb_buffer_to_frame(frame.as_raw(), &mut source, self.width, self.height);

        let mut converted = VideoFrame::empty();
        self.scaler
            .run(&source, &mut converted)
            .map_err(|error| SubplaceError::VideoEncodeError(format!("scaling failed: {error}")))?;
        converted.set_pts(Some(self.frames_written));
        self.frames_written += 1;

        self.encoder
            .send_frame(&converted)
            .map_err(|error| SubplaceError::VideoEncodeError(format!("send_frame failed: {error}")))?;
        self.drain_packets()
    }

    /// Number of frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written as u64
    }

    /// Flush the encoder and write the container trailer.
    ///
    /// # Errors
    ///
    /// Returns [`SubplaceError::VideoEncodeError`] if flushing fails.
    pub fn finish(mut self) -> Result<(), SubplaceError> {
        self.encoder
            .send_eof()
            .map_err(|error| SubplaceError::VideoEncodeError(format!("send_eof failed: {error}")))?;
        self.drain_packets()?;
        self.output.write_trailer().map_err(|error| {
            SubplaceError::VideoEncodeError(format!("cannot write trailer: {error}"))
        })?;
        log::debug!("Encoded {} frame(s)", self.frames_written);
        Ok(())
    }

    fn drain_packets(&mut self) -> Result<(), SubplaceError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet.write_interleaved(&mut self.output).map_err(|error| {
                SubplaceError::VideoEncodeError(format!("write packet failed: {error}"))
            })?;
        }
        Ok(())
    }
}
