//! Compositing subtitles onto frames.
//!
//! The placement engine only decides *where* a subtitle goes. Drawing is
//! behind the [`Renderer`] trait so the frame loop can be driven with any
//! text backend; [`FontRenderer`] is the bundled one, rasterising a
//! TrueType/OpenType font with `imageproc` over a translucent background
//! box.
//!
//! [`SubtitleLayout`] holds the geometry shared by placement and drawing:
//! the text is centred horizontally, its top edge sits `y_offset` pixels
//! above the frame bottom, and the box around it grows by the configured
//! padding.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::configuration::OverlayOptions;
use crate::error::SubplaceError;
use crate::geometry::Rectangle;

/// Visual attributes of a rendered subtitle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubtitleStyle {
    pub text_color: Rgb<u8>,
    pub background_color: Rgb<u8>,
    /// 0 is fully transparent, 1 fully opaque.
    pub background_opacity: f32,
    pub horizontal_padding: u32,
    pub vertical_padding: u32,
    /// Font size in pixels.
    pub font_size: f32,
}

impl From<&OverlayOptions> for SubtitleStyle {
    fn from(options: &OverlayOptions) -> Self {
        Self {
            text_color: options.text_rgb(),
            background_color: options.background_rgb(),
            background_opacity: options.background_opacity.clamp(0.0, 1.0),
            horizontal_padding: options.horizontal_padding,
            vertical_padding: options.vertical_padding,
            font_size: options.font_size,
        }
    }
}

/// Draws subtitle text and measures it.
pub trait Renderer {
    /// Width and height of `text` in pixels, without padding.
    fn measure(&self, text: &str, style: &SubtitleStyle) -> (u32, u32);

    /// Composite `text` onto `frame` with its top-left corner at `(x, y)`.
    fn render(&self, frame: &mut RgbImage, text: &str, x: i32, y: i32, style: &SubtitleStyle);
}

/// Position of a subtitle on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitleLayout {
    /// Left edge of the text.
    pub text_x: i32,
    /// Top edge of the text.
    pub text_y: i32,
    /// Region the subtitle occupies, used for collision checks.
    pub bounds: Rectangle,
}

impl SubtitleLayout {
    /// Lay out text of `text_size` on a frame of `frame_size` at `y_offset`.
    pub fn new(
        frame_size: (u32, u32),
        text_size: (u32, u32),
        y_offset: i32,
        style: &SubtitleStyle,
    ) -> Self {
        let (frame_width, frame_height) = frame_size;
        let (text_width, text_height) = text_size;

        let text_x = (frame_width as i32 - text_width as i32) / 2;
        let text_y = (frame_height as i32).saturating_sub(y_offset);

        Self {
            text_x,
            text_y,
            bounds: Rectangle::new(
                text_x,
                text_y,
                text_width + 2 * style.horizontal_padding,
                text_height + 2 * style.vertical_padding,
            ),
        }
    }
}

/// Renders text with a font loaded from disk.
pub struct FontRenderer {
    font: FontVec,
}

impl FontRenderer {
    /// Load a TrueType or OpenType font file.
    ///
    /// # Errors
    ///
    /// - [`SubplaceError::FileOpen`] if the file cannot be read.
    /// - [`SubplaceError::FontLoad`] if it is not a usable font.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SubplaceError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|error| SubplaceError::FileOpen {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        let font = FontVec::try_from_vec(data).map_err(|error| SubplaceError::FontLoad {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        log::debug!("Loaded font {}", path.display());
        Ok(Self { font })
    }
}

impl Renderer for FontRenderer {
    fn measure(&self, text: &str, style: &SubtitleStyle) -> (u32, u32) {
        if text.is_empty() {
            return (0, 0);
        }
        text_size(PxScale::from(style.font_size), &self.font, text)
    }

    fn render(&self, frame: &mut RgbImage, text: &str, x: i32, y: i32, style: &SubtitleStyle) {
        let (text_width, text_height) = self.measure(text, style);
        let background = Rectangle::new(
            x,
            y,
            text_width + 2 * style.horizontal_padding,
            text_height + 2 * style.vertical_padding,
        );
        fill_translucent(
            frame,
            background,
            style.background_color,
            style.background_opacity,
        );
        draw_text_mut(
            frame,
            style.text_color,
            x + style.horizontal_padding as i32,
            y + style.vertical_padding as i32,
            PxScale::from(style.font_size),
            &self.font,
            text,
        );
    }
}

/// Blend `color` over the part of `rectangle` that lies inside `frame`.
pub fn fill_translucent(frame: &mut RgbImage, rectangle: Rectangle, color: Rgb<u8>, opacity: f32) {
    let bounds = Rectangle::new(0, 0, frame.width(), frame.height());
    let Some(region) = bounds.intersection(&rectangle) else {
        return;
    };

    let alpha = opacity.clamp(0.0, 1.0);
    for y in region.y as u32..region.bottom() as u32 {
        for x in region.x as u32..region.right() as u32 {
            let pixel = frame.get_pixel_mut(x, y);
            for channel in 0..3 {
                let blended =
                    color[channel] as f32 * alpha + pixel[channel] as f32 * (1.0 - alpha);
                pixel[channel] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
