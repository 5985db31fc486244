//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for missing or
//! invalid inputs.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use subplace::{
    DebugFrameWriter, FontRenderer, FrameSource, NoOpDetector, OverlayOptions, OverlayPipeline,
    PlacementPolicy, Rectangle, SubplaceError, VideoWriter, VideoWriterOptions, load_srt,
};

#[test]
fn open_nonexistent_video() {
    let result = FrameSource::open("this_file_does_not_exist.mp4");

    match result {
        Err(SubplaceError::FileOpen { path, .. }) => {
            assert_eq!(path, Path::new("this_file_does_not_exist.mp4"));
        }
        Err(other) => panic!("expected FileOpen, got {other}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[test]
fn open_invalid_video() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    assert!(FrameSource::open(&invalid_file_path).is_err());
}

#[test]
fn missing_subtitles_are_reported_with_path() {
    let error = load_srt("no_such_subtitles.srt").unwrap_err();
    let message = error.to_string();
    assert!(message.contains("no_such_subtitles.srt"), "{message}");
}

#[test]
fn missing_font_is_file_open_error() {
    assert!(matches!(
        FontRenderer::from_file("no_such_font.ttf"),
        Err(SubplaceError::FileOpen { .. })
    ));
}

#[test]
fn garbage_font_is_font_load_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let font_path = temporary_directory.path().join("broken.ttf");
    std::fs::write(&font_path, b"definitely not a font").expect("Failed to write font");

    match FontRenderer::from_file(&font_path) {
        Err(SubplaceError::FontLoad { path, .. }) => assert_eq!(path, font_path),
        Err(other) => panic!("expected FontLoad, got {other}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[test]
fn missing_config_is_file_open_error() {
    assert!(matches!(
        OverlayOptions::from_json_file("no_such_options.json"),
        Err(SubplaceError::FileOpen { .. })
    ));
}

#[test]
fn invalid_options_fail_before_opening_files() {
    let options = OverlayOptions::new().with_sampling_window_frames(0);
    let policy = PlacementPolicy::new(NoOpDetector, &options);
    let renderer = NullRenderer;

    let result = OverlayPipeline::new()
        .with_options(options)
        .analyze("missing.mp4", "missing.srt", policy, &renderer);
    assert!(matches!(result, Err(SubplaceError::InvalidConfiguration(_))));
}

#[test]
fn writer_rejects_empty_dimensions() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("empty.mp4");

    assert!(matches!(
        VideoWriter::create(&output, 25.0, 0, 0, &VideoWriterOptions::default()),
        Err(SubplaceError::VideoEncodeError(_))
    ));
}

#[test]
fn error_messages_carry_context() {
    let error = SubplaceError::MalformedCue {
        block: 7,
        reason: "index \"x\" is not an integer".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Malformed subtitle cue in block 7: index \"x\" is not an integer"
    );
    assert_eq!(SubplaceError::Cancelled.to_string(), "Operation cancelled");
}

// ── Debug frames ───────────────────────────────────────────────────

#[test]
fn debug_writer_saves_annotated_frames() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let directory = temporary_directory.path().join("debug");

    let detector = |_: &DynamicImage| vec![Rectangle::new(2, 2, 20, 8)];
    let policy = PlacementPolicy::new(detector, &OverlayOptions::new())
        .with_observer(DebugFrameWriter::new(&directory).expect("create debug dir"));

    let frame = DynamicImage::new_rgb8(320, 240);
    policy.compute_offset(Rectangle::new(100, 150, 120, 40), &frame);
    policy.compute_offset(Rectangle::new(100, 150, 120, 40), &frame);

    let first = directory.join("decision_000000.png");
    let second = directory.join("decision_000001.png");
    assert!(first.exists() && second.exists());

    let saved = image::open(&first).expect("read debug frame");
    assert_eq!(saved.dimensions(), (320, 240));
    // Padded box (80, 130, 160, 80) is outlined in blue.
    assert_eq!(saved.to_rgb8().get_pixel(80, 130), &image::Rgb([0, 0, 255]));
}

struct NullRenderer;

impl subplace::Renderer for NullRenderer {
    fn measure(&self, _text: &str, _style: &subplace::SubtitleStyle) -> (u32, u32) {
        (0, 0)
    }

    fn render(
        &self,
        _frame: &mut image::RgbImage,
        _text: &str,
        _x: i32,
        _y: i32,
        _style: &subplace::SubtitleStyle,
    ) {
    }
}
