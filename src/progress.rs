//! Progress reporting and cancellation for the frame loop.
//!
//! [`ProgressCallback`] receives [`ProgressInfo`] snapshots while an
//! [`OverlayPipeline`](crate::OverlayPipeline) runs; [`CancellationToken`]
//! stops it between frames.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use subplace::{OverlayPipeline, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(percentage) = info.percentage {
//!             println!("[{:?}] {percentage:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let pipeline = OverlayPipeline::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// What the frame loop is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Compositing subtitles and encoding the result.
    Overlay,
    /// Computing placements without writing video.
    Analysis,
}

/// A snapshot of frame-loop progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub operation: OperationType,
    /// Frames processed so far.
    pub current: u64,
    /// Total frames expected, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// The frame just processed.
    pub current_frame: Option<u64>,
    /// Its presentation time.
    pub current_timestamp: Option<Duration>,
}

/// Receives progress updates.
///
/// Callbacks observe the loop but cannot halt it; use [`CancellationToken`]
/// for that.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. Used when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share the flag, so one can be handed to a signal handler or
/// another thread while the pipeline holds the other.
///
/// ```
/// use subplace::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks timing and emits callbacks every `batch_size` frames.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total: total.filter(|&total| total > 0),
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
        }
    }

    /// Record one processed frame.
    pub(crate) fn advance(&mut self, frame_number: u64, timestamp: Duration) {
        self.current += 1;
        self.since_last_report += 1;

        if self.since_last_report >= self.batch_size {
            self.report(Some(frame_number), Some(timestamp));
            self.since_last_report = 0;
        }
    }

    /// Emit a final report regardless of batching.
    pub(crate) fn finish(&mut self) {
        self.report(None, None);
    }

    fn report(&self, frame_number: Option<u64>, timestamp: Option<Duration>) {
        let elapsed = self.start_time.elapsed();

        // Container frame counts are estimates, so the count can overshoot.
        let percentage = self
            .total
            .map(|total| (self.current as f32 / total as f32 * 100.0).min(100.0));

        let estimated_remaining = if self.current > 0 {
            self.total.map(|total| {
                let remaining = total.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_number,
            current_timestamp: timestamp,
        });
    }
}
