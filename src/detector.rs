//! On-screen text detection.
//!
//! [`TextDetector`] is the seam between the placement engine and whatever
//! OCR engine finds text in a frame region. Detection is best-effort: an
//! engine that is missing or fails is logged and reported as "no text", so
//! callers cannot and need not tell the two apart.
//!
//! Two detectors ship with the crate:
//!
//! - [`TesseractDetector`] runs the `tesseract` executable and merges its TSV
//!   word boxes into one box per text line.
//! - [`NoOpDetector`] never finds anything (detection disabled).
//!
//! Any `Fn(&DynamicImage) -> Vec<Rectangle>` closure is also a detector.
//!
//! # Example
//!
//! ```
//! use image::DynamicImage;
//! use subplace::detector::TextDetector;
//! use subplace::geometry::Rectangle;
//!
//! let fixed = |_: &DynamicImage| vec![Rectangle::new(0, 0, 10, 4)];
//! let boxes = fixed.detect(&DynamicImage::new_rgb8(32, 32));
//! assert_eq!(boxes.len(), 1);
//! ```

use std::process::Command;

use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;

use crate::geometry::Rectangle;

/// Finds text in an image region.
///
/// Returned boxes are in the region's own coordinate space, in no
/// particular order. Implementations must return an empty list, not panic,
/// for zero-sized regions.
pub trait TextDetector {
    fn detect(&self, region: &DynamicImage) -> Vec<Rectangle>;
}

impl<F> TextDetector for F
where
    F: Fn(&DynamicImage) -> Vec<Rectangle>,
{
    fn detect(&self, region: &DynamicImage) -> Vec<Rectangle> {
        self(region)
    }
}

/// A detector that never finds text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDetector;

impl TextDetector for NoOpDetector {
    fn detect(&self, _region: &DynamicImage) -> Vec<Rectangle> {
        Vec::new()
    }
}

/// Text detection through the Tesseract command-line tool.
///
/// Each call writes the region to a temporary PNG and runs
/// `tesseract <png> stdout -l <language> --psm <mode> tsv`. Words with a
/// confidence of at least [`min_confidence`](TesseractDetector::min_confidence)
/// are merged into one box per text line, see [`parse_tesseract_tsv`].
///
/// When the executable is missing or exits with an error the failure is
/// logged at `warn` level and no boxes are returned.
#[derive(Debug, Clone)]
pub struct TesseractDetector {
    executable: String,
    language: String,
    page_segmentation_mode: u32,
    min_confidence: f32,
}

impl Default for TesseractDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractDetector {
    /// English, sparse-text page segmentation (`--psm 11`), any confidence.
    pub fn new() -> Self {
        Self {
            executable: "tesseract".to_string(),
            language: "eng".to_string(),
            page_segmentation_mode: 11,
            min_confidence: 0.0,
        }
    }

    /// Use a specific `tesseract` binary instead of the one on `PATH`.
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Tesseract language code(s), e.g. `"eng"` or `"eng+deu"`.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Tesseract `--psm` value.
    #[must_use]
    pub fn with_page_segmentation_mode(mut self, mode: u32) -> Self {
        self.page_segmentation_mode = mode;
        self
    }

    /// Discard words whose confidence (0–100) is below `confidence`.
    #[must_use]
    pub fn with_min_confidence(mut self, confidence: f32) -> Self {
        self.min_confidence = confidence;
        self
    }

    /// The configured confidence floor.
    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// Returns `true` if the executable can be spawned.
    pub fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn run(&self, region: &DynamicImage) -> Result<String, OcrError> {
        let scratch = tempfile::Builder::new()
            .prefix("subplace-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(OcrError::Scratch)?;

        region
            .to_rgb8()
            .save_with_format(scratch.path(), ImageFormat::Png)?;

        let output = Command::new(&self.executable)
            .arg(scratch.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .arg("tsv")
            .output()
            .map_err(|source| OcrError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                executable: self.executable.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Why a Tesseract run produced no output. Never leaves this module.
#[derive(Debug, Error)]
enum OcrError {
    #[error("cannot create temporary image: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("cannot write temporary image: {0}")]
    Image(#[from] image::ImageError),

    #[error("cannot run {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{executable} failed: {stderr}")]
    Failed { executable: String, stderr: String },
}

impl TextDetector for TesseractDetector {
    fn detect(&self, region: &DynamicImage) -> Vec<Rectangle> {
        let (width, height) = region.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        match self.run(region) {
            Ok(tsv) => parse_tesseract_tsv(&tsv, self.min_confidence),
            Err(error) => {
                log::warn!("Text detection unavailable, assuming no text: {error}");
                Vec::new()
            }
        }
    }
}

/// Extract text-line boxes from Tesseract TSV output.
///
/// Level-5 (word) rows with non-empty text and a confidence of at least
/// `min_confidence` are kept, then merged into one bounding box per
/// `(page, block, paragraph, line)`. Lines come out in the order their first
/// word appears. The header row and short or unparseable rows are skipped.
pub fn parse_tesseract_tsv(tsv: &str, min_confidence: f32) -> Vec<Rectangle> {
    let mut lines: Vec<([u32; 4], Rectangle)> = Vec::new();

    for row in tsv.lines().skip(1) {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < 12 {
            continue;
        }
        if columns[0].trim() != "5" {
            continue;
        }

        let confidence: f32 = columns[10].trim().parse().unwrap_or(-1.0);
        if confidence < 0.0 || confidence < min_confidence || columns[11].trim().is_empty() {
            continue;
        }

        let Some(word) = parse_word_box(&columns[6..10]) else {
            continue;
        };
        let Some(line) = parse_line_key(&columns[1..5]) else {
            continue;
        };

        match lines.iter_mut().find(|(key, _)| *key == line) {
            Some((_, bounds)) => *bounds = bounds.union(&word),
            None => lines.push((line, word)),
        }
    }

    lines.into_iter().map(|(_, bounds)| bounds).collect()
}

fn parse_word_box(columns: &[&str]) -> Option<Rectangle> {
    Some(Rectangle::new(
        columns[0].trim().parse().ok()?,
        columns[1].trim().parse().ok()?,
        columns[2].trim().parse().ok()?,
        columns[3].trim().parse().ok()?,
    ))
}

fn parse_line_key(columns: &[&str]) -> Option<[u32; 4]> {
    let mut key = [0; 4];
    for (slot, column) in key.iter_mut().zip(columns) {
        *slot = column.trim().parse().ok()?;
    }
    Some(key)
}
