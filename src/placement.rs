//! Vertical placement of a subtitle around existing on-screen text.
//!
//! [`PlacementPolicy`] owns a [`TextDetector`] and turns a candidate
//! subtitle box plus the current frame into a [`PlacementDecision`]:
//!
//! 1. pad the candidate box and clamp it to the frame,
//! 2. crop that region and downscale it,
//! 3. detect text in the small crop and map the boxes back to frame
//!    coordinates,
//! 4. apply the configured [`ObstructionStrategy`],
//! 5. fall back to the default offset when nothing is in the way.
//!
//! The result depends only on the frame and the candidate box, so calling
//! [`compute_offset`](PlacementPolicy::compute_offset) twice with the same
//! input gives the same answer. Under [`ObstructionStrategy::Overlap`] the
//! first qualifying box in detector order wins, so two detectors that find
//! the same boxes in a different order can place the subtitle differently.
//!
//! Observers registered with
//! [`with_observer`](PlacementPolicy::with_observer) see every decision
//! along with the boxes that led to it; the policy itself never draws.

use image::{DynamicImage, GenericImageView};
use serde::Serialize;

use crate::configuration::{ObstructionStrategy, OverlayOptions};
use crate::detector::TextDetector;
use crate::error::SubplaceError;
use crate::geometry::{self, Rectangle};

/// Where to draw a subtitle: pixels between the frame bottom and the subtitle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PlacementDecision {
    pub y_offset: i32,
}

impl PlacementDecision {
    pub const fn new(y_offset: i32) -> Self {
        Self { y_offset }
    }
}

/// Everything the policy looked at for one decision.
#[derive(Debug)]
pub struct PlacementReport<'a> {
    /// The frame that was analysed.
    pub frame: &'a DynamicImage,
    /// The subtitle box as it would be drawn at the default offset.
    pub candidate: Rectangle,
    /// The region handed to the detector, in frame coordinates.
    pub padded: Rectangle,
    /// Detected text boxes in frame coordinates, in detector order.
    pub detections: &'a [Rectangle],
    /// The box that triggered the decision, if any.
    pub obstruction: Option<Rectangle>,
    /// The resulting placement.
    pub decision: PlacementDecision,
}

/// Receives a [`PlacementReport`] after every decision.
///
/// Used for debug visualisation and diagnostics; observers cannot alter
/// the decision.
pub trait PlacementObserver {
    fn on_decision(&self, report: &PlacementReport<'_>);
}

/// Computes subtitle offsets from detected text.
pub struct PlacementPolicy {
    detector: Box<dyn TextDetector>,
    observer: Option<Box<dyn PlacementObserver>>,
    options: OverlayOptions,
}

impl PlacementPolicy {
    /// Build a policy that owns `detector` and takes its tunables from `options`.
    ///
    /// The options are not checked here; [`validate`](PlacementPolicy::validate)
    /// does that, and the pipeline calls it before the first frame.
    pub fn new(detector: impl TextDetector + 'static, options: &OverlayOptions) -> Self {
        Self {
            detector: Box::new(detector),
            observer: None,
            options: options.clone(),
        }
    }

    /// Register an observer notified after each decision.
    #[must_use]
    pub fn with_observer(mut self, observer: impl PlacementObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// The placement used when nothing obstructs the subtitle.
    pub fn default_decision(&self) -> PlacementDecision {
        PlacementDecision::new(self.options.default_y_offset)
    }

    /// The active obstruction strategy.
    pub fn strategy(&self) -> ObstructionStrategy {
        self.options.strategy
    }

    /// The options the policy was built from.
    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    /// Check the policy's tunables.
    ///
    /// # Errors
    ///
    /// [`SubplaceError::InvalidConfiguration`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), SubplaceError> {
        self.options.validate()
    }

    /// Decide where the subtitle in `candidate` should go on `frame`.
    pub fn compute_offset(&self, candidate: Rectangle, frame: &DynamicImage) -> PlacementDecision {
        let padded = geometry::pad(candidate, self.options.detection_padding, frame.dimensions());
        let detections = self.detect_around(padded, frame);

        let (decision, obstruction) = match self.options.strategy {
            ObstructionStrategy::Threshold => self.apply_threshold(padded, &detections),
            ObstructionStrategy::Overlap => self.apply_overlap(candidate, &detections),
        };

        log::debug!(
            "Placement for {:?}: {} box(es) detected, {} -> y_offset {}",
            candidate,
            detections.len(),
            self.options.strategy,
            decision.y_offset,
        );

        if let Some(observer) = &self.observer {
            observer.on_decision(&PlacementReport {
                frame,
                candidate,
                padded,
                detections: &detections,
                obstruction,
                decision,
            });
        }

        decision
    }

    /// Crop, downscale, detect and map the boxes back into frame coordinates.
    fn detect_around(&self, padded: Rectangle, frame: &DynamicImage) -> Vec<Rectangle> {
        if padded.is_empty() {
            return Vec::new();
        }

        let scale_factor = self.options.detection_scale_factor;
        let region = geometry::scale(&geometry::crop(frame, padded), scale_factor);
        let (width, height) = region.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        self.detector
            .detect(&region)
            .into_iter()
            .map(|found| geometry::rescale_box(found, scale_factor, (padded.x, padded.y)))
            .collect()
    }

    /// Bump the offset when a detected box is, by area, most of the padded box.
    ///
    /// Compares the detected box's own area with the padded box's area; where
    /// the two boxes actually sit does not matter.
    fn apply_threshold(
        &self,
        padded: Rectangle,
        detections: &[Rectangle],
    ) -> (PlacementDecision, Option<Rectangle>) {
        let padded_area = padded.area();
        if padded_area > 0 {
            for detected in detections {
                log::trace!(
                    "{:?} overlaps {:.1}% of the padded box",
                    detected,
                    geometry::coverage_ratio(padded, *detected) * 100.0,
                );

                let coverage = detected.area() as f64 / padded_area as f64 * 100.0;
                if coverage >= self.options.coverage_threshold_percent {
                    let offset = self
                        .options
                        .default_y_offset
                        .saturating_add(self.options.obstruction_bump);
                    return (PlacementDecision::new(offset), Some(*detected));
                }
            }
        }

        (self.default_decision(), None)
    }

    /// Move above the first box that covers most of the subtitle.
    fn apply_overlap(
        &self,
        candidate: Rectangle,
        detections: &[Rectangle],
    ) -> (PlacementDecision, Option<Rectangle>) {
        for detected in detections {
            let coverage = geometry::coverage_ratio(candidate, *detected) * 100.0;
            if coverage > self.options.overlap_threshold_percent {
                let height = i32::try_from(detected.height).unwrap_or(i32::MAX);
                let offset = detected
                    .y
                    .saturating_sub(height)
                    .saturating_sub(self.options.reposition_margin);
                return (PlacementDecision::new(offset), Some(*detected));
            }
        }

        (self.default_decision(), None)
    }
}
