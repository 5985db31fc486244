//! SubRip subtitle loading.
//!
//! This module provides [`Cue`] for a single timed subtitle entry,
//! [`load_srt`] / [`parse_srt`] for reading SRT data, and [`CueCursor`] for
//! walking the cue list in step with the video's playback clock.
//!
//! Parsing fails fast: the first malformed block aborts the load with
//! [`SubplaceError::MalformedCue`] naming the block, instead of silently
//! dropping it.
//!
//! # Example
//!
//! ```
//! use subplace::subtitle::parse_srt;
//!
//! let cues = parse_srt("1\n00:00:01,000 --> 00:00:02,500\nHello\nthere\n")?;
//! assert_eq!(cues[0].text, "Hello there");
//! assert_eq!(cues[0].end_seconds, 2.5);
//! # Ok::<(), subplace::SubplaceError>(())
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::error::SubplaceError;

/// A single timed subtitle entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    /// The index written in the subtitle file.
    pub index: usize,
    /// When the cue starts displaying, in seconds.
    pub start_seconds: f64,
    /// When the cue stops displaying, in seconds (exclusive).
    pub end_seconds: f64,
    /// Text lines of the block joined by single spaces.
    pub text: String,
}

impl Cue {
    /// Returns `true` if `time` falls within `[start_seconds, end_seconds)`.
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.start_seconds && time < self.end_seconds
    }
}

/// Read and parse an SRT file.
///
/// # Errors
///
/// - [`SubplaceError::FileOpen`] if the file cannot be read.
/// - [`SubplaceError::MalformedCue`] for the first block that fails to parse.
pub fn load_srt<P: AsRef<Path>>(path: P) -> Result<Vec<Cue>, SubplaceError> {
    let path = path.as_ref();
    log::debug!("Loading subtitles from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|error| SubplaceError::FileOpen {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;

    let cues = parse_srt(&content)?;
    log::info!("Loaded {} cue(s) from {}", cues.len(), path.display());
    Ok(cues)
}

/// Parse SRT content into cues, in file order.
///
/// Blocks are separated by blank lines. Each block is an integer index, a
/// `HH:MM:SS,mmm --> HH:MM:SS,mmm` line, and any number of text lines.
/// CRLF line endings and a leading byte-order mark are accepted.
///
/// # Errors
///
/// Returns [`SubplaceError::MalformedCue`] when a block has a non-integer
/// or repeated index, lacks the `-->` separator, carries an unparseable
/// timecode, or ends before it starts. Indices need not be in order.
pub fn parse_srt(content: &str) -> Result<Vec<Cue>, SubplaceError> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");

    let mut cues = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    let mut block_number = 0;
    // Cue index -> block that introduced it.
    let mut seen: HashMap<usize, usize> = HashMap::new();

    for line in content.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                block_number += 1;
                let cue = parse_block(block_number, &lines)?;
                if let Some(first) = seen.insert(cue.index, block_number) {
                    return Err(SubplaceError::MalformedCue {
                        block: block_number,
                        reason: format!("index {} already used by block {first}", cue.index),
                    });
                }
                cues.push(cue);
                lines.clear();
            }
            continue;
        }
        lines.push(line);
    }

    Ok(cues)
}

fn parse_block(block: usize, lines: &[&str]) -> Result<Cue, SubplaceError> {
    let malformed = |reason: String| SubplaceError::MalformedCue { block, reason };

    let index_line = lines[0].trim();
    let index = index_line
        .parse::<usize>()
        .map_err(|_| malformed(format!("index {index_line:?} is not an integer")))?;

    let timing_line = lines
        .get(1)
        .ok_or_else(|| malformed("missing timecode line".to_string()))?;
    let (start, end) = timing_line
        .split_once("-->")
        .ok_or_else(|| malformed(format!("timecode line {timing_line:?} has no \"-->\"")))?;

    let start_seconds = parse_srt_timestamp(start.trim())
        .ok_or_else(|| malformed(format!("invalid start timecode {:?}", start.trim())))?;
    // Anything after the end timecode (SRT position hints) is ignored.
    let end = end.split_whitespace().next().unwrap_or_default();
    let end_seconds = parse_srt_timestamp(end)
        .ok_or_else(|| malformed(format!("invalid end timecode {end:?}")))?;

    if start_seconds > end_seconds {
        return Err(malformed(format!(
            "start {} is after end {}",
            format_srt_timestamp(start_seconds),
            format_srt_timestamp(end_seconds),
        )));
    }

    let text = lines[2..]
        .iter()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Cue {
        index,
        start_seconds,
        end_seconds,
        text,
    })
}

/// Parse an `HH:MM:SS,mmm` timecode into seconds.
///
/// Returns `None` for anything else.
pub fn parse_srt_timestamp(value: &str) -> Option<f64> {
    let (clock, millis) = value.split_once(',')?;
    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    let millis: u64 = millis.trim().parse().ok()?;
    if millis >= 1000 {
        return None;
    }

    Some((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm).
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Forward-only cursor over a cue list, driven by playback time.
///
/// Cues are expected in chronological order. Time must not go backwards
/// between calls to [`advance`](CueCursor::advance).
#[derive(Debug)]
pub struct CueCursor<'a> {
    cues: &'a [Cue],
    position: usize,
}

impl<'a> CueCursor<'a> {
    pub fn new(cues: &'a [Cue]) -> Self {
        Self { cues, position: 0 }
    }

    /// Move to `time` and return the cue active at that instant, if any.
    pub fn advance(&mut self, time: f64) -> Option<&'a Cue> {
        while self.position < self.cues.len() && time >= self.cues[self.position].end_seconds {
            self.position += 1;
        }

        self.cues
            .get(self.position)
            .filter(|cue| cue.is_active_at(time))
    }

    /// Returns `true` once every cue has ended.
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.cues.len()
    }
}
