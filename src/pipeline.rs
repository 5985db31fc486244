//! The frame loop.
//!
//! [`OverlayPipeline`] walks a stream of frames, finds the subtitle cue
//! active at each frame's presentation time, asks a [`SamplingController`]
//! where to put it, composites it with a [`Renderer`] and hands the frame to
//! a [`FrameSink`]. Frames without an active cue pass through untouched.
//!
//! [`run`](OverlayPipeline::run) works on any iterator of frames, so it can
//! be driven from memory; [`burn`](OverlayPipeline::burn) and
//! [`analyze`](OverlayPipeline::analyze) wire it to FFmpeg.
//!
//! # Example
//!
//! ```no_run
//! use subplace::{
//!     FontRenderer, OverlayOptions, OverlayPipeline, PlacementPolicy, TesseractDetector,
//!     VideoWriterOptions,
//! };
//!
//! let options = OverlayOptions::new().with_font_size(28.0);
//! let policy = PlacementPolicy::new(TesseractDetector::new(), &options);
//! let renderer = FontRenderer::from_file("DejaVuSans.ttf")?;
//!
//! let summary = OverlayPipeline::new()
//!     .with_options(options)
//!     .burn("input.mp4", "input.srt", "output.mp4", policy, &renderer, &VideoWriterOptions::default())?;
//! println!("{} frames, {} detector runs", summary.frames_processed, summary.detection_runs);
//! # Ok::<(), subplace::SubplaceError>(())
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, RgbImage};
use serde::Serialize;

use crate::configuration::OverlayOptions;
use crate::encode::{VideoWriter, VideoWriterOptions};
use crate::error::SubplaceError;
use crate::placement::PlacementPolicy;
use crate::progress::{CancellationToken, NoOpProgress, OperationType, ProgressCallback, ProgressTracker};
use crate::render::{Renderer, SubtitleLayout, SubtitleStyle};
use crate::sampling::{OffsetCache, SamplingController};
use crate::subtitle::{self, Cue, CueCursor};
use crate::utilities;
use crate::video::FrameSource;

/// Where processed frames go.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), SubplaceError>;
}

impl FrameSink for VideoWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), SubplaceError> {
        VideoWriter::write_frame(self, frame)
    }
}

/// Collects frames in memory.
impl FrameSink for Vec<RgbImage> {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), SubplaceError> {
        self.push(frame.clone());
        Ok(())
    }
}

/// The placement a cue ended up with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuePlacement {
    pub cue_index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
    /// `None` if no offset was frozen for the cue: it never came on screen,
    /// or it left the screen before its sampling window closed.
    pub y_offset: Option<i32>,
}

/// Outcome of a pass over a video.
#[derive(Debug, Clone, Serialize)]
pub struct OverlaySummary {
    pub frames_processed: u64,
    /// Frames on which a cue was active.
    pub frames_with_subtitles: u64,
    /// How often the placement policy (and so the detector) ran.
    pub detection_runs: u64,
    /// One entry per cue, in file order.
    pub placements: Vec<CuePlacement>,
    #[serde(skip)]
    pub offsets: OffsetCache,
}

/// Drives cues, placement, rendering and output frame by frame.
pub struct OverlayPipeline {
    options: OverlayOptions,
    progress: Arc<dyn ProgressCallback>,
    cancellation: Option<CancellationToken>,
    batch_size: u64,
}

impl Default for OverlayPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayPipeline {
    pub fn new() -> Self {
        Self {
            options: OverlayOptions::new(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Style and sampling settings.
    ///
    /// Placement settings, including the default offset, come from the
    /// [`PlacementPolicy`] passed to each run, which validates its own copy.
    #[must_use]
    pub fn with_options(mut self, options: OverlayOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Stop between frames once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Report progress every `frames` frames.
    #[must_use]
    pub fn with_batch_size(mut self, frames: u64) -> Self {
        self.batch_size = frames.max(1);
        self
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    /// Burn `subtitles` into `input` and encode the result to `output`.
    ///
    /// # Errors
    ///
    /// Any error from opening, parsing, decoding or encoding, or
    /// [`SubplaceError::Cancelled`].
    pub fn burn<V, S, O>(
        &self,
        input: V,
        subtitles: S,
        output: O,
        policy: PlacementPolicy,
        renderer: &dyn Renderer,
        writer_options: &VideoWriterOptions,
    ) -> Result<OverlaySummary, SubplaceError>
    where
        V: AsRef<Path>,
        S: AsRef<Path>,
        O: AsRef<Path>,
    {
        self.options.validate()?;
        let cues = subtitle::load_srt(subtitles)?;
        let source = FrameSource::open(input)?;
        let info = source.info().clone();

        let mut writer = VideoWriter::create(
            output,
            info.frames_per_second,
            info.width,
            info.height,
            writer_options,
        )?;

        let summary = self.run(
            source,
            info.frames_per_second,
            Some(info.frame_count),
            &cues,
            policy,
            renderer,
            Some(&mut writer as &mut dyn FrameSink),
        )?;
        writer.finish()?;
        Ok(summary)
    }

    /// Compute placements for every cue without writing any video.
    ///
    /// # Errors
    ///
    /// Any error from opening, parsing or decoding, or
    /// [`SubplaceError::Cancelled`].
    pub fn analyze<V, S>(
        &self,
        input: V,
        subtitles: S,
        policy: PlacementPolicy,
        renderer: &dyn Renderer,
    ) -> Result<OverlaySummary, SubplaceError>
    where
        V: AsRef<Path>,
        S: AsRef<Path>,
    {
        self.options.validate()?;
        let cues = subtitle::load_srt(subtitles)?;
        let source = FrameSource::open(input)?;
        let frames_per_second = source.info().frames_per_second;
        let total = source.info().frame_count;

        self.run(source, frames_per_second, Some(total), &cues, policy, renderer, None)
    }

    /// Process `frames` numbered from zero at `frames_per_second`.
    ///
    /// With a `sink`, each frame is composited and written; without one,
    /// only placements are computed.
    ///
    /// Cue indices must be unique; placements are cached per index.
    ///
    /// # Errors
    ///
    /// [`SubplaceError::InvalidConfiguration`] for a non-positive frame rate,
    /// out-of-range policy options or a repeated cue index. Otherwise the
    /// first frame error or sink error, or [`SubplaceError::Cancelled`]
    /// once the cancellation token fires. Frames already handed to the sink
    /// stay there.
    #[allow(clippy::too_many_arguments)]
    pub fn run<I>(
        &self,
        frames: I,
        frames_per_second: f64,
        total_frames: Option<u64>,
        cues: &[Cue],
        policy: PlacementPolicy,
        renderer: &dyn Renderer,
        mut sink: Option<&mut dyn FrameSink>,
    ) -> Result<OverlaySummary, SubplaceError>
    where
        I: IntoIterator<Item = Result<(u64, RgbImage), SubplaceError>>,
    {
        if !(frames_per_second > 0.0) {
            return Err(SubplaceError::InvalidConfiguration(format!(
                "frame rate must be positive, got {frames_per_second}"
            )));
        }

        policy.validate()?;
        let mut indices = HashSet::with_capacity(cues.len());
        if let Some(repeated) = cues.iter().find(|cue| !indices.insert(cue.index)) {
            return Err(SubplaceError::InvalidConfiguration(format!(
                "cue index {} is used more than once",
                repeated.index
            )));
        }

        let operation = if sink.is_some() {
            OperationType::Overlay
        } else {
            OperationType::Analysis
        };
        log::info!(
            "Starting {:?} pass: {} cue(s), {:.3} fps, {} strategy",
            operation,
            cues.len(),
            frames_per_second,
            policy.strategy(),
        );

        let style = SubtitleStyle::from(&self.options);
        let mut ordered = cues.to_vec();
        ordered.sort_by(|left, right| left.start_seconds.total_cmp(&right.start_seconds));
        let mut cursor = CueCursor::new(&ordered);
        let mut controller = SamplingController::new(policy, self.options.sampling_window_frames);
        let mut tracker = ProgressTracker::new(
            Arc::clone(&self.progress),
            operation,
            total_frames,
            self.batch_size,
        );

        let mut frames_processed = 0;
        let mut frames_with_subtitles = 0;

        for frame in frames {
            if self
                .cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                log::info!("Cancelled after {frames_processed} frame(s)");
                return Err(SubplaceError::Cancelled);
            }

            let (number, mut image) = frame?;
            let time = utilities::frame_time_seconds(number, frames_per_second);

            match cursor.advance(time) {
                Some(cue) => {
                    frames_with_subtitles += 1;
                    let text_size = renderer.measure(&cue.text, &style);
                    let candidate = SubtitleLayout::new(
                        image.dimensions(),
                        text_size,
                        controller.default_decision().y_offset,
                        &style,
                    );

                    let frame = DynamicImage::ImageRgb8(image);
                    let decision = controller.offset_for(cue, candidate.bounds, &frame);
                    image = frame.into_rgb8();

                    if sink.is_some() {
                        let layout =
                            SubtitleLayout::new(image.dimensions(), text_size, decision.y_offset, &style);
                        renderer.render(&mut image, &cue.text, layout.text_x, layout.text_y, &style);
                    }
                }
                None => controller.deactivate(),
            }

            if let Some(sink) = sink.as_deref_mut() {
                sink.write_frame(&image)?;
            }

            frames_processed += 1;
            tracker.advance(number, utilities::frame_timestamp(number, frames_per_second));
        }

        tracker.finish();

        let detection_runs = controller.detection_runs();
        let offsets = controller.into_cache();
        let placements = cues
            .iter()
            .map(|cue| CuePlacement {
                cue_index: cue.index,
                start_seconds: cue.start_seconds,
                end_seconds: cue.end_seconds,
                text: cue.text.clone(),
                y_offset: offsets.get(cue.index).map(|decision| decision.y_offset),
            })
            .collect();

        log::info!(
            "Processed {frames_processed} frame(s), {frames_with_subtitles} with subtitles, {detection_runs} detector run(s), {} cue(s) resolved",
            offsets.len(),
        );

        Ok(OverlaySummary {
            frames_processed,
            frames_with_subtitles,
            detection_runs,
            placements,
            offsets,
        })
    }
}
