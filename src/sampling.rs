//! Bounding the cost of text detection across frames.
//!
//! OCR is by far the most expensive step of a run, so [`SamplingController`]
//! does not ask the [`PlacementPolicy`] for every frame. Each cue moves
//! through three states:
//!
//! - [`CueState::Unseen`] until its first active frame,
//! - [`CueState::Sampling`] for at most `sampling_window_frames` active
//!   frames, re-running placement on each; the first non-default offset
//!   resolves the cue immediately,
//! - [`CueState::Resolved`] once an offset has been cached; detection is
//!   skipped for the rest of the cue.
//!
//! When a cue stops being active its state returns to `Unseen`, but the
//! [`OffsetCache`] entry survives: a cue that shows up again reuses the
//! offset it resolved to the first time. Cache entries are never replaced.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use image::DynamicImage;

use crate::geometry::Rectangle;
use crate::placement::{PlacementDecision, PlacementPolicy};
use crate::subtitle::Cue;

/// Sampling progress of a single cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueState {
    /// Not active yet, or no longer active.
    Unseen,
    /// Placement is being computed on each active frame.
    Sampling {
        /// Active frames analysed so far.
        frames_sampled: u32,
    },
    /// An offset is cached; detection is skipped.
    Resolved,
}

/// Resolved offsets keyed by cue index.
///
/// Holds at most one entry per cue and only ever grows: the first
/// resolution of a cue wins.
#[derive(Debug, Clone, Default)]
pub struct OffsetCache {
    entries: BTreeMap<usize, PlacementDecision>,
}

impl OffsetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached decision for `cue_index`, if resolved.
    pub fn get(&self, cue_index: usize) -> Option<PlacementDecision> {
        self.entries.get(&cue_index).copied()
    }

    /// Store `decision` unless the cue already has one.
    ///
    /// Returns the decision that is cached after the call.
    pub fn insert_if_absent(
        &mut self,
        cue_index: usize,
        decision: PlacementDecision,
    ) -> PlacementDecision {
        match self.entries.entry(cue_index) {
            Entry::Occupied(existing) => *existing.get(),
            Entry::Vacant(slot) => *slot.insert(decision),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached decisions in cue-index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, PlacementDecision)> + '_ {
        self.entries.iter().map(|(index, decision)| (*index, *decision))
    }
}

/// Decides when to run placement and remembers the result per cue.
pub struct SamplingController {
    policy: PlacementPolicy,
    window: u32,
    cache: OffsetCache,
    active: Option<(usize, CueState)>,
    detection_runs: u64,
}

impl SamplingController {
    /// Wrap `policy`, sampling each cue for at most `window` frames.
    ///
    /// A window of zero is treated as one.
    pub fn new(policy: PlacementPolicy, window: u32) -> Self {
        Self {
            policy,
            window: window.max(1),
            cache: OffsetCache::new(),
            active: None,
            detection_runs: 0,
        }
    }

    /// The offset to draw `cue` at on this frame.
    ///
    /// Runs the placement policy while the cue is still being sampled and
    /// returns the cached value afterwards.
    pub fn offset_for(
        &mut self,
        cue: &Cue,
        candidate: Rectangle,
        frame: &DynamicImage,
    ) -> PlacementDecision {
        if self.active.map(|(index, _)| index) != Some(cue.index) {
            self.deactivate();
        }

        if let Some(cached) = self.cache.get(cue.index) {
            self.active = Some((cue.index, CueState::Resolved));
            return cached;
        }

        let frames_sampled = match self.active {
            Some((_, CueState::Sampling { frames_sampled })) => frames_sampled + 1,
            _ => 1,
        };

        let decision = self.policy.compute_offset(candidate, frame);
        self.detection_runs += 1;

        if decision != self.policy.default_decision() || frames_sampled >= self.window {
            log::debug!(
                "Cue {} resolved after {} sampled frame(s) at y_offset {}",
                cue.index,
                frames_sampled,
                decision.y_offset,
            );
            let cached = self.cache.insert_if_absent(cue.index, decision);
            self.active = Some((cue.index, CueState::Resolved));
            return cached;
        }

        self.active = Some((cue.index, CueState::Sampling { frames_sampled }));
        decision
    }

    /// Signal that no cue is active on the current frame.
    pub fn deactivate(&mut self) {
        self.active = None;
    }

    /// The state of `cue_index` as of the last processed frame.
    pub fn state(&self, cue_index: usize) -> CueState {
        match self.active {
            Some((index, state)) if index == cue_index => state,
            _ => CueState::Unseen,
        }
    }

    /// Resolved offsets so far.
    pub fn cache(&self) -> &OffsetCache {
        &self.cache
    }

    /// Number of times the placement policy has run.
    pub fn detection_runs(&self) -> u64 {
        self.detection_runs
    }

    /// The policy's unobstructed placement.
    pub fn default_decision(&self) -> PlacementDecision {
        self.policy.default_decision()
    }

    /// Hand back the resolved offsets, ending the pass.
    pub fn into_cache(self) -> OffsetCache {
        self.cache
    }
}
