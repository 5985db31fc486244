//! Rectangle arithmetic used by the placement engine.
//!
//! Everything here works in pixel coordinates with the origin in the
//! top-left corner of the frame. Degenerate input is clamped rather than
//! rejected: a zero-area box has zero coverage, a crop that falls outside
//! the image shrinks to what is available, and so on.
//!
//! # Example
//!
//! ```
//! use subplace::geometry::{Rectangle, coverage_ratio, pad};
//!
//! let subtitle = Rectangle::new(100, 400, 200, 40);
//! let padded = pad(subtitle, 20, (640, 480));
//! assert_eq!(padded, Rectangle::new(80, 380, 240, 80));
//!
//! assert_eq!(coverage_ratio(subtitle, subtitle), 1.0);
//! ```

use image::{DynamicImage, GenericImageView};
use serde::Serialize;

/// An axis-aligned rectangle `(x, y, width, height)`.
///
/// `x` and `y` are signed so boxes mapped back from a scaled crop, or
/// shifted by an offset, can be represented without wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rectangle {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Horizontal extent.
    pub width: u32,
    /// Vertical extent.
    pub height: u32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// One past the right-most column.
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// One past the bottom-most row.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Returns `true` when the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The overlapping region of two rectangles, if they overlap at all.
    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return None;
        }

        Some(Rectangle {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// The smallest rectangle containing both.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        let left = (self.x as i64).min(other.x as i64);
        let top = (self.y as i64).min(other.y as i64);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        Rectangle {
            x: left as i32,
            y: top as i32,
            width: (right - left).min(u32::MAX as i64) as u32,
            height: (bottom - top).min(u32::MAX as i64) as u32,
        }
    }
}

/// Grow `rectangle` by `padding` on every side, clamped to the frame.
///
/// The top-left corner is clamped to zero first and the size is then cut
/// down to fit `frame_bounds` (`(width, height)`). Near the top or left edge
/// the padding lost on that side is not redistributed, so the result can be
/// smaller than `width + 2 * padding`.
pub fn pad(rectangle: Rectangle, padding: u32, frame_bounds: (u32, u32)) -> Rectangle {
    let (frame_width, frame_height) = frame_bounds;
    let padding = padding as i64;

    let x = (rectangle.x as i64 - padding).max(0);
    let y = (rectangle.y as i64 - padding).max(0);
    let width = (rectangle.width as i64 + 2 * padding)
        .min(frame_width as i64 - x)
        .max(0);
    let height = (rectangle.height as i64 + 2 * padding)
        .min(frame_height as i64 - y)
        .max(0);

    Rectangle {
        x: x.min(i32::MAX as i64) as i32,
        y: y.min(i32::MAX as i64) as i32,
        width: width as u32,
        height: height as u32,
    }
}

/// Crop `image` to `rectangle`.
///
/// The rectangle is clipped to the image first; a box entirely outside the
/// image yields an empty image.
pub fn crop(image: &DynamicImage, rectangle: Rectangle) -> DynamicImage {
    let (image_width, image_height) = image.dimensions();
    let bounds = Rectangle::new(0, 0, image_width, image_height);

    match bounds.intersection(&rectangle) {
        Some(clipped) => image.crop_imm(
            clipped.x as u32,
            clipped.y as u32,
            clipped.width,
            clipped.height,
        ),
        None => image.crop_imm(0, 0, 0, 0),
    }
}

/// Uniformly downscale `image` by `factor`.
///
/// New dimensions are `floor(dimension * factor)`. Each destination pixel
/// is the area-weighted average of the source pixels it covers. Factors outside
/// `(0, 1]` are clamped into that range; a factor of exactly 1 returns a copy.
pub fn scale(image: &DynamicImage, factor: f64) -> DynamicImage {
    let factor = clamp_factor(factor);
    if factor >= 1.0 {
        return image.clone();
    }

    let (width, height) = image.dimensions();
    let new_width = (width as f64 * factor) as u32;
    let new_height = (height as f64 * factor) as u32;

    if new_width == 0 || new_height == 0 {
        return image.crop_imm(0, 0, 0, 0);
    }

    image.thumbnail_exact(new_width, new_height)
}

/// Fraction of `reference` covered by its intersection with `other`.
///
/// Returns a value in `[0, 1]`. A zero-area reference yields `0.0`.
pub fn coverage_ratio(reference: Rectangle, other: Rectangle) -> f64 {
    let reference_area = reference.area();
    if reference_area == 0 {
        return 0.0;
    }

    let overlap = reference
        .intersection(&other)
        .map(|region| region.area())
        .unwrap_or(0);

    (overlap as f64 / reference_area as f64).clamp(0.0, 1.0)
}

/// Map a box detected in a scaled crop back to full-frame coordinates.
///
/// Every component is divided by `factor` (truncating), then the box is
/// translated by `origin`, the crop's top-left corner in the full frame.
/// Coordinates saturate at the `i32` range.
pub fn rescale_box(rectangle: Rectangle, factor: f64, origin: (i32, i32)) -> Rectangle {
    let factor = clamp_factor(factor);
    let (origin_x, origin_y) = origin;

    Rectangle {
        x: ((rectangle.x as f64 / factor) as i32).saturating_add(origin_x),
        y: ((rectangle.y as f64 / factor) as i32).saturating_add(origin_y),
        width: (rectangle.width as f64 / factor) as u32,
        height: (rectangle.height as f64 / factor) as u32,
    }
}

fn clamp_factor(factor: f64) -> f64 {
    if factor.is_nan() || factor <= 0.0 {
        f64::MIN_POSITIVE
    } else {
        factor.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_touching_boxes_is_none() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(10, 0, 10, 10);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn intersection_handles_negative_origin() {
        let a = Rectangle::new(-5, -5, 10, 10);
        let b = Rectangle::new(0, 0, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rectangle::new(0, 0, 5, 5)));
    }

    #[test]
    fn crop_outside_image_is_empty() {
        let image = DynamicImage::new_rgb8(20, 20);
        let cropped = crop(&image, Rectangle::new(40, 40, 5, 5));
        assert_eq!(cropped.dimensions(), (0, 0));
    }

    #[test]
    fn scale_floors_dimensions() {
        let image = DynamicImage::new_rgb8(101, 51);
        assert_eq!(scale(&image, 0.5).dimensions(), (50, 25));
        assert_eq!(scale(&image, 0.3).dimensions(), (30, 15));
    }
}
