//! Error types for the `subalign` crate.
//!
//! This module defines [`AlignError`], the unified error type returned by all
//! fallible operations in the crate. Configuration problems are surfaced
//! before any frame is touched and can be distinguished from per-request
//! conditions via [`AlignError::is_configuration`].

use std::io::Error as IoError;

use thiserror::Error;

/// The unified error type for all `subalign` operations.
///
/// Every public method that can fail returns `Result<T, AlignError>`.
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AlignError {
    /// The configured color tolerance lies outside the accepted range.
    #[error("Tolerance {value} is out of range (expected 0 to 255)")]
    ToleranceOutOfRange {
        /// The tolerance value that was supplied.
        value: i64,
    },

    /// A search-window limit is negative.
    #[error("Search window {field} must be non-negative, got {value}")]
    InvalidSearchWindow {
        /// Which limit was invalid (`"max backward"` or `"max forward"`).
        field: &'static str,
        /// The value that was supplied.
        value: i64,
    },

    /// A configuration field could not be parsed as an integer.
    #[error("Configuration value {field} is not a valid integer: {value:?}")]
    ConfigurationParse {
        /// The field that failed to parse.
        field: &'static str,
        /// The raw text that was supplied.
        value: String,
    },

    /// The seed pixel's color does not match the reference within tolerance
    /// at the reference frame. The affected request is skipped; the run
    /// continues.
    #[error("Seed point ({x}, {y}) does not match the reference color within tolerance")]
    NoMatchAtSeed {
        /// Seed x coordinate.
        x: u32,
        /// Seed y coordinate.
        y: u32,
    },

    /// A frame buffer handed to the core does not satisfy the layout
    /// contract (pitch, size).
    #[error("Invalid frame data: {reason}")]
    InvalidFrame {
        /// What was wrong with the buffer.
        reason: String,
    },

    /// The requested frame number exceeds the total frame count.
    #[error("Frame {frame_number} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The frame number that was requested.
        frame_number: u64,
        /// The total number of frames in the video.
        total_frames: u64,
    },

    /// An alignment request targets a subtitle line that does not exist.
    #[error("Subtitle line {index} is out of range (document has {count} lines)")]
    LineOutOfRange {
        /// The requested line index.
        index: usize,
        /// The number of lines in the document.
        count: usize,
    },

    /// The frame source failed to deliver a frame. Treated as fatal and
    /// never retried.
    #[error("Frame source error: {0}")]
    FrameSource(String),

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A subtitle document could not be parsed.
    #[error("Subtitle parse error at line {line}: {reason}")]
    SubtitleParse {
        /// One-based line number in the source text.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// The settings store could not encode or decode the settings document.
    #[error("Settings error: {reason}")]
    Settings {
        /// What went wrong.
        reason: String,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl AlignError {
    /// Returns `true` for the configuration class of errors — the ones the
    /// job runner reports before any frame processing begins.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AlignError::ToleranceOutOfRange { .. }
                | AlignError::InvalidSearchWindow { .. }
                | AlignError::ConfigurationParse { .. }
        )
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for AlignError {
    fn from(error: ffmpeg_next::Error) -> Self {
        AlignError::FrameSource(error.to_string())
    }
}
