//! Annotated frame dumps for inspecting placement decisions.
//!
//! [`DebugFrameWriter`] is a [`PlacementObserver`] that saves a copy of each
//! analysed frame with the padded search region outlined in blue, every
//! detected text box in red, and the box that moved the subtitle in yellow.
//! Attach it with [`PlacementPolicy::with_observer`](crate::PlacementPolicy::with_observer).

use std::cell::Cell;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::error::SubplaceError;
use crate::geometry::Rectangle;
use crate::placement::{PlacementObserver, PlacementReport};

const PADDED_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const DETECTION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const OBSTRUCTION_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Writes `decision_NNNNNN.png` files into a directory.
#[derive(Debug)]
pub struct DebugFrameWriter {
    directory: PathBuf,
    written: Cell<u64>,
}

impl DebugFrameWriter {
    /// Write annotated frames into `directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SubplaceError::IoError`] if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self, SubplaceError> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            written: Cell::new(0),
        })
    }

    /// Number of frames saved so far.
    pub fn frames_written(&self) -> u64 {
        self.written.get()
    }
}

impl PlacementObserver for DebugFrameWriter {
    fn on_decision(&self, report: &PlacementReport<'_>) {
        let mut canvas = report.frame.to_rgb8();

        // Thicker outline for the search region.
        for inset in 0..3 {
            outline(&mut canvas, shrink(report.padded, inset), PADDED_COLOR);
        }
        for detection in report.detections {
            outline(&mut canvas, *detection, DETECTION_COLOR);
        }
        if let Some(obstruction) = report.obstruction {
            outline(&mut canvas, obstruction, OBSTRUCTION_COLOR);
        }

        let number = self.written.get();
        let path = self.directory.join(format!("decision_{number:06}.png"));
        match canvas.save(&path) {
            Ok(()) => self.written.set(number + 1),
            Err(error) => log::warn!("Could not save debug frame {}: {error}", path.display()),
        }
    }
}

fn outline(canvas: &mut RgbImage, rectangle: Rectangle, color: Rgb<u8>) {
    if rectangle.is_empty() {
        return;
    }
    let rect = Rect::at(rectangle.x, rectangle.y).of_size(rectangle.width, rectangle.height);
    draw_hollow_rect_mut(canvas, rect, color);
}

fn shrink(rectangle: Rectangle, inset: u32) -> Rectangle {
    Rectangle::new(
        rectangle.x + inset as i32,
        rectangle.y + inset as i32,
        rectangle.width.saturating_sub(2 * inset),
        rectangle.height.saturating_sub(2 * inset),
    )
}
