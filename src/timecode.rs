//! Frame index ↔ presentation time mapping.
//!
//! Subtitle timestamps are written by looking frame indices up in a
//! [`TimecodeTable`], which supports distinct rounding modes for range
//! starts and range ends: a range start maps to the instant its frame
//! begins, while a range end is **exclusive** — it maps to the instant the
//! *next* frame begins. Two implementations are provided:
//! [`ConstantTimecodes`] for constant-frame-rate clips and
//! [`VfrTimecodes`] for variable-frame-rate clips described by a sorted
//! presentation-timestamp list.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use subalign::timecode::{ConstantTimecodes, TimeRounding, TimecodeTable};
//!
//! let table = ConstantTimecodes::new(25.0);
//! assert_eq!(table.time_at_frame(25, TimeRounding::Start), Duration::from_secs(1));
//! assert_eq!(table.frame_at_time(Duration::from_secs(1), TimeRounding::Start), 25);
//! ```

use std::time::Duration;

use crate::error::AlignError;

/// Fallback frame duration when a clip is too short to measure one.
const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(40);

/// How a time ↔ frame lookup rounds at range boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRounding {
    /// Lookup for the start of a range: the instant the frame begins.
    Start,
    /// Lookup for the end of a range: exclusive of the frame, i.e. the
    /// instant the following frame begins.
    End,
}

/// Bidirectional mapping between frame indices and presentation times.
///
/// Implementations are immutable for the duration of an alignment run.
/// The exact rounding semantics belong to the table; callers pass the
/// [`TimeRounding`] that matches which side of a range they are resolving.
pub trait TimecodeTable {
    /// Presentation time of `frame` under the given rounding.
    fn time_at_frame(&self, frame: u64, rounding: TimeRounding) -> Duration;

    /// Frame index displayed at `time` under the given rounding.
    fn frame_at_time(&self, time: Duration, rounding: TimeRounding) -> u64;
}

/// Timecodes for a constant-frame-rate clip.
#[derive(Debug, Clone, Copy)]
pub struct ConstantTimecodes {
    frames_per_second: f64,
}

impl ConstantTimecodes {
    /// Create a table for a clip running at `frames_per_second`.
    ///
    /// Non-positive rates are clamped to a minimal positive value rather
    /// than producing divisions by zero.
    pub fn new(frames_per_second: f64) -> Self {
        Self {
            frames_per_second: frames_per_second.max(f64::MIN_POSITIVE),
        }
    }
}

impl TimecodeTable for ConstantTimecodes {
    fn time_at_frame(&self, frame: u64, rounding: TimeRounding) -> Duration {
        let index = match rounding {
            TimeRounding::Start => frame,
            TimeRounding::End => frame + 1,
        };
        Duration::from_secs_f64(index as f64 / self.frames_per_second)
    }

    fn frame_at_time(&self, time: Duration, rounding: TimeRounding) -> u64 {
        let position = time.as_secs_f64() * self.frames_per_second;
        match rounding {
            // The frame on screen at `time`.
            TimeRounding::Start => position.floor() as u64,
            // The last frame that begins strictly before `time`.
            TimeRounding::End => (position.ceil() as i64 - 1).max(0) as u64,
        }
    }
}

/// Timecodes for a variable-frame-rate clip.
///
/// Built from one presentation timestamp per frame, in display order. The
/// exclusive end time of the final frame is extrapolated from the last
/// observed frame interval (or the mean interval when the last one is
/// degenerate).
#[derive(Debug, Clone)]
pub struct VfrTimecodes {
    pts: Vec<Duration>,
    /// Exclusive end time of the last frame.
    end_of_clip: Duration,
}

impl VfrTimecodes {
    /// Build a table from per-frame presentation timestamps.
    ///
    /// The list is sorted into display order. An empty list means the clip
    /// has no video frames.
    ///
    /// # Errors
    ///
    /// Returns [`AlignError::NoVideoStream`] for an empty list.
    pub fn from_pts(mut pts: Vec<Duration>) -> Result<Self, AlignError> {
        if pts.is_empty() {
            return Err(AlignError::NoVideoStream);
        }
        pts.sort_unstable();

        let last_interval = match pts.len() {
            1 => DEFAULT_FRAME_DURATION,
            n => {
                let last = pts[n - 1].saturating_sub(pts[n - 2]);
                if last.is_zero() {
                    // Degenerate final interval; fall back to the mean.
                    let span = pts[n - 1].saturating_sub(pts[0]);
                    let mean = span / (n as u32 - 1);
                    if mean.is_zero() { DEFAULT_FRAME_DURATION } else { mean }
                } else {
                    last
                }
            }
        };
        let end_of_clip = pts[pts.len() - 1] + last_interval;

        Ok(Self { pts, end_of_clip })
    }

    /// Number of frames described by the table.
    pub fn frame_count(&self) -> u64 {
        self.pts.len() as u64
    }
}

impl TimecodeTable for VfrTimecodes {
    fn time_at_frame(&self, frame: u64, rounding: TimeRounding) -> Duration {
        let last = self.pts.len() - 1;
        let index = (frame as usize).min(last);
        match rounding {
            TimeRounding::Start => self.pts[index],
            TimeRounding::End => {
                if index < last {
                    self.pts[index + 1]
                } else {
                    self.end_of_clip
                }
            }
        }
    }

    fn frame_at_time(&self, time: Duration, rounding: TimeRounding) -> u64 {
        let started = match rounding {
            // Frames whose start is at or before `time`.
            TimeRounding::Start => self.pts.partition_point(|&p| p <= time),
            // Frames that begin strictly before `time`.
            TimeRounding::End => self.pts.partition_point(|&p| p < time),
        };
        started.saturating_sub(1) as u64
    }
}
