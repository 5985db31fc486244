//! Overlay configuration.
//!
//! [`OverlayOptions`] collects every tunable of a run: subtitle style, the
//! default placement, and the knobs of the collision-avoidance engine. It is
//! a builder, so only the values that differ from the defaults need to be
//! spelled out, and it can be loaded from a JSON file where any missing
//! field keeps its default.
//!
//! # Example
//!
//! ```
//! use subplace::{ObstructionStrategy, OverlayOptions};
//!
//! let options = OverlayOptions::new()
//!     .with_default_y_offset(60)
//!     .with_strategy(ObstructionStrategy::Overlap)
//!     .with_sampling_window_frames(15);
//! options.validate()?;
//! # Ok::<(), subplace::SubplaceError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::error::SubplaceError;

/// How detected text is judged to obstruct the subtitle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstructionStrategy {
    /// A detected box whose own area is at least
    /// [`coverage_threshold_percent`](OverlayOptions::coverage_threshold_percent)
    /// of the padded subtitle box's area bumps the offset up by
    /// [`obstruction_bump`](OverlayOptions::obstruction_bump). This is the default.
    #[default]
    Threshold,
    /// The first detected box that covers more than
    /// [`overlap_threshold_percent`](OverlayOptions::overlap_threshold_percent)
    /// of the subtitle box moves the subtitle above it. Which box wins
    /// depends on the detector's output order.
    Overlap,
}

impl Display for ObstructionStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ObstructionStrategy::Threshold => write!(f, "threshold"),
            ObstructionStrategy::Overlap => write!(f, "overlap"),
        }
    }
}

/// All settings for an overlay run.
///
/// Defaults: offset 50px from the bottom, white text on a half-transparent
/// black box with 10px padding, 20px font, 20px detection padding at half
/// scale, a 10-frame sampling window, the threshold strategy at 70% (bump
/// 15px) and the overlap strategy at 90% (10px margin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    /// Pixels between the frame bottom and the subtitle when nothing is in the way.
    pub default_y_offset: i32,
    /// Opacity of the background box, 0 (transparent) to 1 (opaque).
    pub background_opacity: f32,
    /// Text colour as RGB.
    pub text_color: [u8; 3],
    /// Background box colour as RGB.
    pub background_color: [u8; 3],
    /// Space left and right of the text inside the background box.
    pub horizontal_padding: u32,
    /// Space above and below the text inside the background box.
    pub vertical_padding: u32,
    /// Font size in pixels.
    pub font_size: f32,
    /// Margin added around the subtitle box before looking for text.
    pub detection_padding: u32,
    /// Downscale factor applied to the padded region before detection, in `(0, 1]`.
    pub detection_scale_factor: f64,
    /// Frames a cue is sampled for before its offset is frozen.
    pub sampling_window_frames: u32,
    /// Threshold strategy trigger, percent of the padded box area.
    pub coverage_threshold_percent: f64,
    /// Overlap strategy trigger, percent of the subtitle box area.
    pub overlap_threshold_percent: f64,
    /// Which obstruction test to apply.
    pub strategy: ObstructionStrategy,
    /// Pixels added to the default offset when the threshold strategy fires.
    pub obstruction_bump: i32,
    /// Gap the overlap strategy leaves above the obstructing text.
    pub reposition_margin: i32,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            default_y_offset: 50,
            background_opacity: 0.5,
            text_color: [255, 255, 255],
            background_color: [0, 0, 0],
            horizontal_padding: 10,
            vertical_padding: 10,
            font_size: 20.0,
            detection_padding: 20,
            detection_scale_factor: 0.5,
            sampling_window_frames: 10,
            coverage_threshold_percent: 70.0,
            overlap_threshold_percent: 90.0,
            strategy: ObstructionStrategy::Threshold,
            obstruction_bump: 15,
            reposition_margin: 10,
        }
    }

    /// Load options from a JSON file. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// - [`SubplaceError::FileOpen`] if the file cannot be read or parsed.
    /// - [`SubplaceError::InvalidConfiguration`] if a value is out of range.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SubplaceError> {
        let path = path.as_ref();
        log::debug!("Loading overlay options from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|error| SubplaceError::FileOpen {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        let options: OverlayOptions =
            serde_json::from_str(&content).map_err(|error| SubplaceError::FileOpen {
                path: path.to_path_buf(),
                reason: format!("invalid JSON options: {error}"),
            })?;

        options.validate()?;
        Ok(options)
    }

    /// Check that every value is within its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`SubplaceError::InvalidConfiguration`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), SubplaceError> {
        let invalid = |message: String| Err(SubplaceError::InvalidConfiguration(message));

        if !(0.0..=1.0).contains(&self.background_opacity) {
            return invalid(format!(
                "background_opacity must be within 0..=1, got {}",
                self.background_opacity
            ));
        }
        if !(self.detection_scale_factor > 0.0 && self.detection_scale_factor <= 1.0) {
            return invalid(format!(
                "detection_scale_factor must be within (0, 1], got {}",
                self.detection_scale_factor
            ));
        }
        if self.sampling_window_frames == 0 {
            return invalid("sampling_window_frames must be at least 1".to_string());
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return invalid(format!("font_size must be positive, got {}", self.font_size));
        }
        for (name, value) in [
            ("coverage_threshold_percent", self.coverage_threshold_percent),
            ("overlap_threshold_percent", self.overlap_threshold_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return invalid(format!("{name} must be within 0..=100, got {value}"));
            }
        }
        Ok(())
    }

    /// Set the default distance from the frame bottom.
    #[must_use]
    pub fn with_default_y_offset(mut self, offset: i32) -> Self {
        self.default_y_offset = offset;
        self
    }

    /// Set the background box opacity.
    #[must_use]
    pub fn with_background_opacity(mut self, opacity: f32) -> Self {
        self.background_opacity = opacity;
        self
    }

    /// Set the text colour.
    #[must_use]
    pub fn with_text_color(mut self, color: [u8; 3]) -> Self {
        self.text_color = color;
        self
    }

    /// Set the background box colour.
    #[must_use]
    pub fn with_background_color(mut self, color: [u8; 3]) -> Self {
        self.background_color = color;
        self
    }

    /// Set the padding inside the background box.
    #[must_use]
    pub fn with_padding(mut self, horizontal: u32, vertical: u32) -> Self {
        self.horizontal_padding = horizontal;
        self.vertical_padding = vertical;
        self
    }

    /// Set the font size in pixels.
    #[must_use]
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    /// Set the margin searched around the subtitle box.
    #[must_use]
    pub fn with_detection_padding(mut self, padding: u32) -> Self {
        self.detection_padding = padding;
        self
    }

    /// Set the downscale factor used before detection.
    #[must_use]
    pub fn with_detection_scale_factor(mut self, factor: f64) -> Self {
        self.detection_scale_factor = factor;
        self
    }

    /// Set how many frames a cue is sampled for.
    #[must_use]
    pub fn with_sampling_window_frames(mut self, frames: u32) -> Self {
        self.sampling_window_frames = frames;
        self
    }

    /// Set the threshold strategy trigger in percent.
    #[must_use]
    pub fn with_coverage_threshold_percent(mut self, percent: f64) -> Self {
        self.coverage_threshold_percent = percent;
        self
    }

    /// Set the overlap strategy trigger in percent.
    #[must_use]
    pub fn with_overlap_threshold_percent(mut self, percent: f64) -> Self {
        self.overlap_threshold_percent = percent;
        self
    }

    /// Select the obstruction strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ObstructionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the threshold strategy's offset bump.
    #[must_use]
    pub fn with_obstruction_bump(mut self, bump: i32) -> Self {
        self.obstruction_bump = bump;
        self
    }

    /// Set the overlap strategy's gap above obstructing text.
    #[must_use]
    pub fn with_reposition_margin(mut self, margin: i32) -> Self {
        self.reposition_margin = margin;
        self
    }

    pub(crate) fn text_rgb(&self) -> Rgb<u8> {
        Rgb(self.text_color)
    }

    pub(crate) fn background_rgb(&self) -> Rgb<u8> {
        Rgb(self.background_color)
    }
}
