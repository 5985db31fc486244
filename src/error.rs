//! Error types for the `subplace` crate.
//!
//! This module defines [`SubplaceError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry enough context (file
//! paths, subtitle block numbers, upstream messages) to diagnose a failed run
//! without additional logging at the call site.
//!
//! Text detection never produces an error: an unavailable OCR engine is
//! reported through the `log` facade and treated as "no text found".

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `subplace` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubplaceError {
    /// An input file (video, subtitles, configuration, font) could not be opened.
    #[error("Failed to open {path}: {reason}")]
    FileOpen {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// A subtitle block could not be parsed or violates `start <= end`.
    #[error("Malformed subtitle cue in block {block}: {reason}")]
    MalformedCue {
        /// One-based position of the offending block in the subtitle file.
        block: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// A composited frame could not be encoded or written.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// An option value is out of its accepted range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The renderer's font could not be loaded.
    #[error("Failed to load font at {path}: {reason}")]
    FontLoad {
        /// Path of the font file.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The frame loop was stopped via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for SubplaceError {
    fn from(error: FfmpegError) -> Self {
        SubplaceError::FfmpegError(error.to_string())
    }
}
