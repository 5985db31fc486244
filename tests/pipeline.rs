//! Frame loop tests over synthetic frames.

use std::cell::RefCell;

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use subplace::render::fill_translucent;
use subplace::{
    Cue, NoOpDetector, ObstructionStrategy, OverlayOptions, OverlayPipeline, PlacementPolicy,
    Rectangle, Renderer, SubplaceError, SubtitleStyle, parse_srt,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

/// Draws each subtitle as a solid block of its text colour.
#[derive(Default)]
struct BlockRenderer {
    calls: RefCell<Vec<(String, i32, i32)>>,
}

impl Renderer for BlockRenderer {
    fn measure(&self, text: &str, _style: &SubtitleStyle) -> (u32, u32) {
        (text.len() as u32 * 10, 20)
    }

    fn render(&self, frame: &mut RgbImage, text: &str, x: i32, y: i32, style: &SubtitleStyle) {
        self.calls.borrow_mut().push((text.to_string(), x, y));
        let (width, height) = self.measure(text, style);
        fill_translucent(frame, Rectangle::new(x, y, width, height), style.text_color, 1.0);
    }
}

fn frames(count: u64, color: Rgb<u8>) -> Vec<Result<(u64, RgbImage), SubplaceError>> {
    (0..count)
        .map(|number| Ok((number, RgbImage::from_pixel(WIDTH, HEIGHT, color))))
        .collect()
}

fn hello_cue() -> Vec<Cue> {
    parse_srt("1\n00:00:00,500 --> 00:00:01,000\nHello\n").unwrap()
}

// ── Compositing ────────────────────────────────────────────────────

#[test]
fn subtitles_are_drawn_only_while_active() {
    let options = OverlayOptions::new();
    let renderer = BlockRenderer::default();
    let mut written: Vec<RgbImage> = Vec::new();

    let summary = OverlayPipeline::new()
        .with_options(options.clone())
        .run(
            frames(60, Rgb([0, 0, 0])),
            30.0,
            Some(60),
            &hello_cue(),
            PlacementPolicy::new(NoOpDetector, &options),
            &renderer,
            Some(&mut written),
        )
        .unwrap();

    assert_eq!(summary.frames_processed, 60);
    assert_eq!(summary.frames_with_subtitles, 15);
    assert_eq!(written.len(), 60);

    // "Hello" measures 50x20: centred at x = (320 - 50) / 2, top at 240 - 50.
    let calls = renderer.calls.borrow();
    assert_eq!(calls.len(), 15);
    assert!(calls.iter().all(|call| *call == ("Hello".to_string(), 135, 190)));

    assert_eq!(written[14].get_pixel(140, 195), &Rgb([0, 0, 0]));
    assert_eq!(written[15].get_pixel(140, 195), &Rgb([255, 255, 255]));
    assert_eq!(written[29].get_pixel(140, 195), &Rgb([255, 255, 255]));
    assert_eq!(written[30].get_pixel(140, 195), &Rgb([0, 0, 0]));
}

#[test]
fn sampling_window_bounds_detection_runs() {
    let options = OverlayOptions::new();
    let summary = OverlayPipeline::new()
        .run(
            frames(60, Rgb([0, 0, 0])),
            30.0,
            None,
            &hello_cue(),
            PlacementPolicy::new(NoOpDetector, &options),
            &BlockRenderer::default(),
            None,
        )
        .unwrap();

    assert_eq!(summary.detection_runs, 10);
    assert_eq!(summary.offsets.len(), 1);
    assert_eq!(summary.placements.len(), 1);
    assert_eq!(summary.placements[0].y_offset, Some(50));
}

#[test]
fn obstructed_subtitle_is_drawn_higher() {
    let options = OverlayOptions::new()
        .with_strategy(ObstructionStrategy::Overlap)
        .with_detection_scale_factor(1.0);
    let detector = |region: &DynamicImage| {
        let (width, height) = region.dimensions();
        vec![Rectangle::new(0, 0, width, height)]
    };
    let renderer = BlockRenderer::default();
    let mut written: Vec<RgbImage> = Vec::new();

    let summary = OverlayPipeline::new()
        .with_options(options.clone())
        .run(
            frames(30, Rgb([40, 40, 40])),
            30.0,
            None,
            &hello_cue(),
            PlacementPolicy::new(detector, &options),
            &renderer,
            Some(&mut written),
        )
        .unwrap();

    // Candidate (135, 190, 70, 40) pads to (115, 170, 110, 70): 170 - 70 - 10.
    assert_eq!(summary.placements[0].y_offset, Some(90));
    assert_eq!(summary.detection_runs, 1);
    assert!(renderer.calls.borrow().iter().all(|(_, _, y)| *y == 150));
}

#[test]
fn analysis_does_not_render() {
    let renderer = BlockRenderer::default();
    OverlayPipeline::new()
        .run(
            frames(30, Rgb([0, 0, 0])),
            30.0,
            None,
            &hello_cue(),
            PlacementPolicy::new(NoOpDetector, &OverlayOptions::new()),
            &renderer,
            None,
        )
        .unwrap();

    assert!(renderer.calls.borrow().is_empty());
}

// ── Cue ordering ───────────────────────────────────────────────────

#[test]
fn cues_out_of_file_order_are_still_shown() {
    let cues = parse_srt(
        "2\n00:00:01,000 --> 00:00:02,000\nSecond\n\n1\n00:00:00,000 --> 00:00:01,000\nFirst\n",
    )
    .unwrap();
    let renderer = BlockRenderer::default();
    let mut written: Vec<RgbImage> = Vec::new();

    let summary = OverlayPipeline::new()
        .run(
            frames(60, Rgb([0, 0, 0])),
            30.0,
            None,
            &cues,
            PlacementPolicy::new(NoOpDetector, &OverlayOptions::new()),
            &renderer,
            Some(&mut written),
        )
        .unwrap();

    let calls = renderer.calls.borrow();
    assert_eq!(calls.first().map(|call| call.0.as_str()), Some("First"));
    assert_eq!(calls.last().map(|call| call.0.as_str()), Some("Second"));
    assert_eq!(summary.frames_with_subtitles, 60);

    // Placements follow file order.
    let indices: Vec<usize> = summary.placements.iter().map(|placement| placement.cue_index).collect();
    assert_eq!(indices, vec![2, 1]);
}

// ── Errors ─────────────────────────────────────────────────────────

#[test]
fn frame_errors_stop_the_loop() {
    let mut input = frames(5, Rgb([0, 0, 0]));
    input.insert(3, Err(SubplaceError::VideoDecodeError("corrupt packet".to_string())));
    let mut written: Vec<RgbImage> = Vec::new();

    let result = OverlayPipeline::new().run(
        input,
        30.0,
        None,
        &hello_cue(),
        PlacementPolicy::new(NoOpDetector, &OverlayOptions::new()),
        &BlockRenderer::default(),
        Some(&mut written),
    );

    assert!(matches!(result, Err(SubplaceError::VideoDecodeError(_))));
    assert_eq!(written.len(), 3);
}

#[test]
fn non_positive_frame_rate_is_rejected() {
    let result = OverlayPipeline::new().run(
        frames(1, Rgb([0, 0, 0])),
        0.0,
        None,
        &hello_cue(),
        PlacementPolicy::new(NoOpDetector, &OverlayOptions::new()),
        &BlockRenderer::default(),
        None,
    );
    assert!(matches!(result, Err(SubplaceError::InvalidConfiguration(_))));
}

#[test]
fn repeated_cue_index_is_rejected() {
    let cue = |start: f64, text: &str| Cue {
        index: 1,
        start_seconds: start,
        end_seconds: start + 1.0,
        text: text.to_string(),
    };
    let result = OverlayPipeline::new().run(
        frames(90, Rgb([0, 0, 0])),
        30.0,
        None,
        &[cue(0.0, "A"), cue(2.0, "B")],
        PlacementPolicy::new(NoOpDetector, &OverlayOptions::new()),
        &BlockRenderer::default(),
        None,
    );
    assert!(matches!(result, Err(SubplaceError::InvalidConfiguration(_))));
}

#[test]
fn policy_options_are_validated() {
    let invalid = OverlayOptions::new().with_coverage_threshold_percent(150.0);
    let result = OverlayPipeline::new().run(
        frames(1, Rgb([0, 0, 0])),
        30.0,
        None,
        &hello_cue(),
        PlacementPolicy::new(NoOpDetector, &invalid),
        &BlockRenderer::default(),
        None,
    );
    assert!(matches!(result, Err(SubplaceError::InvalidConfiguration(_))));
}

#[test]
fn no_cues_passes_frames_through() {
    let mut written: Vec<RgbImage> = Vec::new();
    let summary = OverlayPipeline::new()
        .run(
            frames(4, Rgb([9, 9, 9])),
            25.0,
            None,
            &[],
            PlacementPolicy::new(NoOpDetector, &OverlayOptions::new()),
            &BlockRenderer::default(),
            Some(&mut written),
        )
        .unwrap();

    assert_eq!(summary.detection_runs, 0);
    assert!(summary.placements.is_empty());
    assert!(written.iter().all(|frame| frame.pixels().all(|pixel| *pixel == Rgb([9, 9, 9]))));
}
