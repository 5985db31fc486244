//! Progress and cancellation tests over in-memory frames.

use std::sync::{Arc, Mutex};

use image::{DynamicImage, RgbImage};
use subplace::{
    CancellationToken, Cue, NoOpDetector, OperationType, OverlayOptions, OverlayPipeline,
    PlacementPolicy, ProgressCallback, ProgressInfo, Renderer, SubplaceError, SubtitleStyle,
};

struct NullRenderer;

impl Renderer for NullRenderer {
    fn measure(&self, text: &str, _style: &SubtitleStyle) -> (u32, u32) {
        (text.len() as u32 * 8, 16)
    }

    fn render(&self, _frame: &mut RgbImage, _text: &str, _x: i32, _y: i32, _style: &SubtitleStyle) {}
}

fn frames(count: u64) -> impl Iterator<Item = Result<(u64, RgbImage), SubplaceError>> {
    (0..count).map(|number| Ok((number, RgbImage::new(64, 48))))
}

fn cues() -> Vec<Cue> {
    vec![Cue {
        index: 1,
        start_seconds: 0.0,
        end_seconds: 1.0,
        text: "hi".to_string(),
    }]
}

fn policy() -> PlacementPolicy {
    PlacementPolicy::new(NoOpDetector, &OverlayOptions::new())
}

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    assert!(!CancellationToken::new().is_cancelled());
    assert!(!CancellationToken::default().is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    token.cancel();
    assert!(clone.is_cancelled());
}

// ── Progress callbacks ─────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    reports: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.reports.lock().unwrap().push(info.clone());
    }
}

#[test]
fn progress_is_reported_per_batch() {
    let recorder = Arc::new(Recorder::default());
    let pipeline = OverlayPipeline::new()
        .with_progress(recorder.clone())
        .with_batch_size(10);

    pipeline
        .run(frames(60), 30.0, Some(60), &cues(), policy(), &NullRenderer, None)
        .unwrap();

    let reports = recorder.reports.lock().unwrap();
    // Six batches plus the final report.
    assert_eq!(reports.len(), 7);
    assert!(reports.iter().all(|info| info.operation == OperationType::Analysis));
    assert_eq!(reports[0].current, 10);
    assert_eq!(reports[0].current_frame, Some(9));

    let last = reports.last().unwrap();
    assert_eq!(last.current, 60);
    assert_eq!(last.total, Some(60));
    assert_eq!(last.percentage, Some(100.0));
}

#[test]
fn unknown_total_has_no_percentage() {
    let recorder = Arc::new(Recorder::default());
    let pipeline = OverlayPipeline::new().with_progress(recorder.clone());

    pipeline
        .run(frames(3), 30.0, None, &cues(), policy(), &NullRenderer, None)
        .unwrap();

    let reports = recorder.reports.lock().unwrap();
    assert!(reports.iter().all(|info| info.percentage.is_none()));
    assert!(reports.iter().all(|info| info.estimated_remaining.is_none()));
}

#[test]
fn sink_marks_overlay_operation() {
    let recorder = Arc::new(Recorder::default());
    let pipeline = OverlayPipeline::new().with_progress(recorder.clone());
    let mut written: Vec<RgbImage> = Vec::new();

    pipeline
        .run(frames(2), 30.0, Some(2), &cues(), policy(), &NullRenderer, Some(&mut written))
        .unwrap();

    assert_eq!(written.len(), 2);
    let reports = recorder.reports.lock().unwrap();
    assert!(reports.iter().all(|info| info.operation == OperationType::Overlay));
}

// ── Cancellation ───────────────────────────────────────────────────

struct CancelAfter {
    frames: u64,
    token: CancellationToken,
}

impl ProgressCallback for CancelAfter {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.current >= self.frames {
            self.token.cancel();
        }
    }
}

#[test]
fn cancellation_stops_between_frames() {
    let token = CancellationToken::new();
    let pipeline = OverlayPipeline::new()
        .with_cancellation(token.clone())
        .with_progress(Arc::new(CancelAfter {
            frames: 5,
            token: token.clone(),
        }));
    let mut written: Vec<RgbImage> = Vec::new();

    let result = pipeline.run(
        frames(60),
        30.0,
        Some(60),
        &cues(),
        policy(),
        &NullRenderer,
        Some(&mut written),
    );

    assert!(matches!(result, Err(SubplaceError::Cancelled)));
    assert_eq!(written.len(), 5);
}

#[test]
fn cancelled_before_start_processes_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let pipeline = OverlayPipeline::new().with_cancellation(token);

    let result = pipeline.run(frames(10), 30.0, None, &cues(), policy(), &NullRenderer, None);
    assert!(matches!(result, Err(SubplaceError::Cancelled)));
}

#[test]
fn frames_are_untouched_by_null_renderer() {
    let pipeline = OverlayPipeline::new();
    let mut written: Vec<RgbImage> = Vec::new();
    pipeline
        .run(frames(1), 30.0, None, &cues(), policy(), &NullRenderer, Some(&mut written))
        .unwrap();

    assert_eq!(DynamicImage::ImageRgb8(written.remove(0)), DynamicImage::new_rgb8(64, 48));
}
