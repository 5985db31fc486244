//! Geometry helper tests.

use image::{DynamicImage, GenericImageView};
use subplace::Rectangle;
use subplace::geometry::{coverage_ratio, crop, pad, rescale_box, scale};

// ── coverage_ratio ─────────────────────────────────────────────────

#[test]
fn coverage_of_box_with_itself_is_one() {
    for rectangle in [
        Rectangle::new(0, 0, 1, 1),
        Rectangle::new(100, 100, 200, 50),
        Rectangle::new(-20, 5, 40, 40),
    ] {
        assert_eq!(coverage_ratio(rectangle, rectangle), 1.0);
    }
}

#[test]
fn coverage_of_disjoint_boxes_is_zero() {
    let a = Rectangle::new(0, 0, 50, 50);
    let b = Rectangle::new(200, 200, 50, 50);
    assert_eq!(coverage_ratio(a, b), 0.0);
    assert_eq!(coverage_ratio(b, a), 0.0);
}

#[test]
fn coverage_of_zero_area_reference_is_zero() {
    let empty = Rectangle::new(10, 10, 0, 30);
    assert_eq!(coverage_ratio(empty, Rectangle::new(0, 0, 100, 100)), 0.0);
}

#[test]
fn coverage_is_measured_against_the_reference() {
    let candidate = Rectangle::new(100, 100, 200, 50);
    let detected = Rectangle::new(110, 110, 190, 40);
    // 190 * 40 of 200 * 50.
    assert!((coverage_ratio(candidate, detected) - 0.76).abs() < 1e-9);
    assert_eq!(coverage_ratio(detected, candidate), 1.0);
}

// ── pad ────────────────────────────────────────────────────────────

#[test]
fn pad_grows_every_side() {
    let padded = pad(Rectangle::new(100, 400, 200, 40), 20, (640, 480));
    assert_eq!(padded, Rectangle::new(80, 380, 240, 80));
}

#[test]
fn pad_stays_within_frame() {
    let frame = (640_u32, 480_u32);
    let rectangles = [
        Rectangle::new(0, 0, 10, 10),
        Rectangle::new(630, 470, 10, 10),
        Rectangle::new(-50, 460, 800, 100),
        Rectangle::new(300, 200, 40, 40),
    ];

    for rectangle in rectangles {
        let padded = pad(rectangle, 25, frame);
        assert!(padded.x >= 0 && padded.y >= 0, "{padded:?}");
        assert!(padded.right() <= frame.0 as i64, "{padded:?}");
        assert!(padded.bottom() <= frame.1 as i64, "{padded:?}");
    }
}

#[test]
fn pad_near_bottom_is_cut_short() {
    let padded = pad(Rectangle::new(100, 450, 200, 40), 20, (640, 480));
    assert_eq!(padded, Rectangle::new(80, 430, 240, 50));
}

#[test]
fn pad_outside_frame_is_empty() {
    let padded = pad(Rectangle::new(1000, 1000, 10, 10), 5, (640, 480));
    assert!(padded.is_empty());
}

// ── crop / scale ───────────────────────────────────────────────────

#[test]
fn crop_clips_to_image() {
    let image = DynamicImage::new_rgb8(100, 80);
    let cropped = crop(&image, Rectangle::new(90, 70, 30, 30));
    assert_eq!(cropped.dimensions(), (10, 10));
}

#[test]
fn scale_halves_dimensions() {
    let image = DynamicImage::new_rgb8(240, 80);
    assert_eq!(scale(&image, 0.5).dimensions(), (120, 40));
    assert_eq!(scale(&image, 1.0).dimensions(), (240, 80));
}

#[test]
fn scale_averages_pixels() {
    let mut image = image::RgbImage::new(2, 2);
    image.put_pixel(0, 0, image::Rgb([200, 200, 200]));
    let scaled = scale(&DynamicImage::ImageRgb8(image), 0.5).to_rgb8();
    assert_eq!(scaled.dimensions(), (1, 1));
    assert_eq!(scaled.get_pixel(0, 0)[0], 50);
}

// ── rescale_box ────────────────────────────────────────────────────

/// Bounding box of the pixels brighter than mid-grey.
fn bright_bounds(image: &DynamicImage) -> Option<Rectangle> {
    let image = image.to_luma8();
    let bright: Vec<(u32, u32)> = image
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel[0] > 128)
        .map(|(x, y, _)| (x, y))
        .collect();

    let left = bright.iter().map(|(x, _)| *x).min()?;
    let right = bright.iter().map(|(x, _)| *x).max()?;
    let top = bright.iter().map(|(_, y)| *y).min()?;
    let bottom = bright.iter().map(|(_, y)| *y).max()?;
    Some(Rectangle::new(
        left as i32,
        top as i32,
        right - left + 1,
        bottom - top + 1,
    ))
}

#[test]
fn rescale_round_trips_within_one_pixel() {
    for original in [
        Rectangle::new(60, 80, 40, 20),
        Rectangle::new(0, 0, 24, 12),
        Rectangle::new(150, 170, 50, 30),
    ] {
        let mut frame = image::RgbImage::new(200, 200);
        for y in original.y..original.y + original.height as i32 {
            for x in original.x..original.x + original.width as i32 {
                frame.put_pixel(x as u32, y as u32, image::Rgb([255, 255, 255]));
            }
        }
        let frame = DynamicImage::ImageRgb8(frame);

        let padded = pad(original, 20, frame.dimensions());
        let region = scale(&crop(&frame, padded), 0.5);
        let detected = bright_bounds(&region).expect("box survives downscaling");
        let restored = rescale_box(detected, 0.5, (padded.x, padded.y));

        assert!((restored.x - original.x).abs() <= 1, "{original:?} -> {restored:?}");
        assert!((restored.y - original.y).abs() <= 1, "{original:?} -> {restored:?}");
        assert!(restored.width.abs_diff(original.width) <= 1, "{original:?} -> {restored:?}");
        assert!(restored.height.abs_diff(original.height) <= 1, "{original:?} -> {restored:?}");
    }
}

#[test]
fn rescale_saturates_instead_of_overflowing() {
    let restored = rescale_box(Rectangle::new(i32::MAX - 1, i32::MIN + 1, 4, 4), 1.0, (100, -100));
    assert_eq!((restored.x, restored.y), (i32::MAX, i32::MIN));
}

#[test]
fn union_spans_both_boxes() {
    let a = Rectangle::new(10, 10, 40, 16);
    let b = Rectangle::new(60, 8, 40, 20);
    assert_eq!(a.union(&b), Rectangle::new(10, 8, 90, 20));
    assert_eq!(b.union(&a), a.union(&b));
}

#[test]
fn rescale_translates_by_origin() {
    let restored = rescale_box(Rectangle::new(5, 10, 20, 8), 0.5, (80, 380));
    assert_eq!(restored, Rectangle::new(90, 400, 40, 16));
}
