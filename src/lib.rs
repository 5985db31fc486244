//! # subplace
//!
//! Burn subtitles into video without covering text that is already on
//! screen.
//!
//! Burned-in captions, scoreboards and channel overlays often sit exactly
//! where subtitles go. `subplace` looks at the region a subtitle would occupy,
//! runs optical text detection on it, and moves the subtitle up when it
//! would collide with existing text.
//!
//! ## Quick Start
//!
//! ```no_run
//! use subplace::{
//!     DebugFrameWriter, FontRenderer, OverlayOptions, OverlayPipeline, PlacementPolicy,
//!     TesseractDetector, VideoWriterOptions,
//! };
//!
//! let options = OverlayOptions::new();
//! let policy = PlacementPolicy::new(TesseractDetector::new(), &options)
//!     .with_observer(DebugFrameWriter::new("debug_frames")?);
//! let renderer = FontRenderer::from_file("DejaVuSans.ttf")?;
//!
//! OverlayPipeline::new()
//!     .with_options(options)
//!     .burn("input.mp4", "input.srt", "output.mp4", policy, &renderer, &VideoWriterOptions::default())?;
//! # Ok::<(), subplace::SubplaceError>(())
//! ```
//!
//! ## Placement in isolation
//!
//! The placement engine does not need FFmpeg; any closure returning boxes is
//! a [`TextDetector`]:
//!
//! ```
//! use image::DynamicImage;
//! use subplace::{ObstructionStrategy, OverlayOptions, PlacementPolicy, Rectangle};
//!
//! let options = OverlayOptions::new().with_strategy(ObstructionStrategy::Overlap);
//! let detector = |_: &DynamicImage| vec![Rectangle::new(0, 0, 1000, 1000)];
//! let policy = PlacementPolicy::new(detector, &options);
//!
//! let frame = DynamicImage::new_rgb8(640, 480);
//! let decision = policy.compute_offset(Rectangle::new(220, 430, 200, 40), &frame);
//! assert_ne!(decision, policy.default_decision());
//! ```
//!
//! ## Components
//!
//! - [`subtitle`]: SRT parsing into validated [`Cue`]s
//! - [`detector`]: the [`TextDetector`] trait and a Tesseract-backed detector
//! - [`geometry`]: padding, cropping, scaling and coverage of [`Rectangle`]s
//! - [`placement`]: [`PlacementPolicy`], turning detections into an offset
//! - [`sampling`]: [`SamplingController`], bounding detector calls per cue
//! - [`render`]: the [`Renderer`] trait and [`FontRenderer`]
//! - [`pipeline`]: [`OverlayPipeline`], the frame loop
//! - [`video`] and [`encode`]: FFmpeg decoding and encoding
//! - [`debug`]: annotated frame dumps
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed. Text detection shells out
//! to the `tesseract` executable; without it every frame keeps the default
//! placement.

pub mod configuration;
pub mod debug;
pub mod detector;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod geometry;
pub mod pipeline;
pub mod placement;
pub mod progress;
pub mod render;
pub mod sampling;
pub mod subtitle;
mod utilities;
pub mod video;

pub use configuration::{ObstructionStrategy, OverlayOptions};
pub use debug::DebugFrameWriter;
pub use detector::{NoOpDetector, TesseractDetector, TextDetector};
pub use encode::{VideoCodec, VideoWriter, VideoWriterOptions};
pub use error::SubplaceError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use geometry::Rectangle;
pub use pipeline::{CuePlacement, FrameSink, OverlayPipeline, OverlaySummary};
pub use placement::{PlacementDecision, PlacementObserver, PlacementPolicy, PlacementReport};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use render::{FontRenderer, Renderer, SubtitleLayout, SubtitleStyle};
pub use sampling::{CueState, OffsetCache, SamplingController};
pub use subtitle::{Cue, CueCursor, load_srt, parse_srt};
pub use utilities::{frame_time_seconds, frame_timestamp};
pub use video::{FrameSource, VideoInfo};
