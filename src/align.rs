//! The alignment job runner.
//!
//! Picks collected during an interactive phase become
//! [`AlignmentRequest`] values in a queue; [`Aligner::run`] drains that
//! queue most-recent-first, runs the full pipeline for each request —
//! capture the region on the reference frame, track its span through the
//! clip, map the span to timestamps — and writes the resulting start/end
//! into the target subtitle lines. The caller commits the document once
//! after the run.
//!
//! A run moves from idle through running to either completed or cancelled;
//! cancellation is polled once per request, and requests not yet processed
//! stay queued. Configuration is validated when [`AlignConfig`] is built,
//! before any frame is touched.
//!
//! # Example
//!
//! ```no_run
//! use subalign::align::{AlignConfig, Aligner, AlignmentRequest, RunOptions};
//! use subalign::frame::{FrameSource, VideoFrame};
//! use subalign::subtitle::SubtitleDocument;
//! use subalign::timecode::ConstantTimecodes;
//!
//! # struct Decoder;
//! # impl FrameSource for Decoder {
//! #     fn frame(&mut self, _n: u64, _exact: bool) -> Result<VideoFrame, subalign::AlignError> {
//! #         unimplemented!()
//! #     }
//! #     fn frame_count(&self) -> u64 { 100 }
//! # }
//! # fn main() -> Result<(), subalign::AlignError> {
//! // Any FrameSource works: an FFmpeg-backed decoder (see the `media`
//! // module, `ffmpeg` feature) or synthetic frames in tests.
//! let mut source = Decoder;
//! let timecodes = ConstantTimecodes::new(23.976);
//! let mut document = SubtitleDocument::load_srt("input.srt")?;
//!
//! let config = AlignConfig::new(8, 0, 0)?;
//! let mut queue = vec![AlignmentRequest {
//!     x: 100,
//!     y: 200,
//!     reference_frame: 50,
//!     line: 0,
//! }];
//!
//! let mut aligner = Aligner::new(&mut source, &timecodes, config);
//! let report = aligner.run(&mut queue, &mut document, &RunOptions::new())?;
//! println!("{} aligned, {} skipped", report.processed - report.skipped, report.skipped);
//! document.save_srt("output.srt")?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::AlignError;
use crate::frame::FrameSource;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback, ProgressInfo};
use crate::search::{SearchWindow, TrackedRegion, track_span};
use crate::settings::AlignSettings;
use crate::subtitle::SubtitleDocument;
use crate::timecode::{TimeRounding, TimecodeTable};

/// Validated configuration for an alignment session.
///
/// Construction is the validation boundary: a value of this type always
/// holds a tolerance in `[0, 255]` and non-negative window limits, so the
/// runner never needs to re-check them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignConfig {
    /// Max Lab-distance color tolerance.
    pub tolerance: u8,
    /// Temporal search limits.
    pub window: SearchWindow,
}

impl AlignConfig {
    /// Validate raw integer configuration values.
    ///
    /// # Errors
    ///
    /// - [`AlignError::ToleranceOutOfRange`] unless `0 <= tolerance <= 255`.
    /// - [`AlignError::InvalidSearchWindow`] for negative window limits.
    pub fn new(tolerance: i64, max_backward: i64, max_forward: i64) -> Result<Self, AlignError> {
        if !(0..=255).contains(&tolerance) {
            return Err(AlignError::ToleranceOutOfRange { value: tolerance });
        }
        if max_backward < 0 || max_backward > i64::from(u32::MAX) {
            return Err(AlignError::InvalidSearchWindow {
                field: "max backward",
                value: max_backward,
            });
        }
        if max_forward < 0 || max_forward > i64::from(u32::MAX) {
            return Err(AlignError::InvalidSearchWindow {
                field: "max forward",
                value: max_forward,
            });
        }
        Ok(Self {
            tolerance: tolerance as u8,
            window: SearchWindow {
                max_backward: max_backward as u32,
                max_forward: max_forward as u32,
            },
        })
    }

    /// Validate persisted settings.
    ///
    /// # Errors
    ///
    /// Same as [`AlignConfig::new`].
    pub fn from_settings(settings: &AlignSettings) -> Result<Self, AlignError> {
        Self::new(
            settings.tolerance,
            settings.max_backward,
            settings.max_forward,
        )
    }

    /// Parse and validate user-edited text values.
    ///
    /// # Errors
    ///
    /// [`AlignError::ConfigurationParse`] when a field is not an integer,
    /// plus the range errors from [`AlignConfig::new`].
    pub fn parse(
        tolerance: &str,
        max_backward: &str,
        max_forward: &str,
    ) -> Result<Self, AlignError> {
        let parse = |field: &'static str, text: &str| -> Result<i64, AlignError> {
            text.trim()
                .parse()
                .map_err(|_| AlignError::ConfigurationParse {
                    field,
                    value: text.to_string(),
                })
        };
        Self::new(
            parse("tolerance", tolerance)?,
            parse("max backward", max_backward)?,
            parse("max forward", max_forward)?,
        )
    }
}

/// One queued pick: a seed point on a reference frame, bound to a subtitle
/// line.
///
/// Created once per user pick and consumed exactly once by the runner, in
/// last-queued-first-processed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentRequest {
    /// Seed x coordinate on the reference frame.
    pub x: u32,
    /// Seed y coordinate on the reference frame.
    pub y: u32,
    /// The frame the pick was made on.
    pub reference_frame: u64,
    /// Index of the target line in the subtitle document.
    pub line: usize,
}

/// How an alignment run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignOutcome {
    /// The queue was drained.
    Completed,
    /// Cancellation was observed; unprocessed requests remain queued.
    Cancelled,
}

/// Summary of an alignment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignReport {
    /// Whether the run completed or was cancelled.
    pub outcome: AlignOutcome,
    /// Requests consumed from the queue.
    pub processed: u64,
    /// Consumed requests that were skipped because their seed no longer
    /// matched.
    pub skipped: u64,
}

/// Options threaded through an alignment run.
///
/// Carries the progress callback and cancellation token without polluting
/// the runner's signature. A default-constructed value reports nothing and
/// never cancels.
#[derive(Clone)]
pub struct RunOptions {
    progress: Arc<dyn ProgressCallback>,
    cancellation: Option<CancellationToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RunOptions {
    /// Create options with no progress callback and no cancellation.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Attach a progress callback.
    ///
    /// Invoked once before each request and once when the run ends.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// Polled once per queued request; a cancelled token stops the run
    /// with [`AlignOutcome::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    fn report(&self, current: u64, total: u64, message: impl Into<String>) {
        self.progress.on_progress(&ProgressInfo {
            current,
            total,
            message: message.into(),
        });
    }
}

/// The alignment job runner.
///
/// Borrows a frame source and a timecode table for the duration of a
/// session and drives the tracking pipeline for each queued request.
pub struct Aligner<'a, S: FrameSource + ?Sized, T: TimecodeTable + ?Sized> {
    source: &'a mut S,
    timecodes: &'a T,
    config: AlignConfig,
}

impl<'a, S: FrameSource + ?Sized, T: TimecodeTable + ?Sized> Aligner<'a, S, T> {
    /// Create a runner over a frame source and timecode table.
    pub fn new(source: &'a mut S, timecodes: &'a T, config: AlignConfig) -> Self {
        Self {
            source,
            timecodes,
            config,
        }
    }

    /// Drain `queue` and write aligned timestamps into `document`.
    ///
    /// Requests are processed most-recently-queued first. A request whose
    /// seed no longer matches is skipped with a warning; frame-source and
    /// collaborator failures abort the run. On cancellation the remaining
    /// requests stay in `queue` untouched — they are neither rolled back
    /// nor reprocessed. An empty queue completes immediately.
    ///
    /// The document is only mutated in memory; committing it (e.g.
    /// [`SubtitleDocument::save_srt`]) is the caller's single post-run
    /// step.
    ///
    /// # Errors
    ///
    /// - [`AlignError::LineOutOfRange`] when a request targets a line the
    ///   document does not have.
    /// - [`AlignError::FrameOutOfRange`] / [`AlignError::FrameSource`]
    ///   from the frame source.
    pub fn run(
        &mut self,
        queue: &mut Vec<AlignmentRequest>,
        document: &mut SubtitleDocument,
        options: &RunOptions,
    ) -> Result<AlignReport, AlignError> {
        let total = queue.len() as u64;
        if total == 0 {
            options.report(0, 0, "Nothing to align");
            return Ok(AlignReport {
                outcome: AlignOutcome::Completed,
                processed: 0,
                skipped: 0,
            });
        }

        let mut processed = 0;
        let mut skipped = 0;

        while let Some(request) = queue.last().copied() {
            if options.is_cancelled() {
                log::debug!("Alignment cancelled with {} request(s) queued", queue.len());
                options.report(processed, total, "Cancelled");
                return Ok(AlignReport {
                    outcome: AlignOutcome::Cancelled,
                    processed,
                    skipped,
                });
            }

            options.report(
                processed,
                total,
                format!("Processing key point {} of {total}", processed + 1),
            );

            queue.pop();
            match self.align_request(&request) {
                Ok((start, end)) => {
                    let count = document.lines.len();
                    let line = document.lines.get_mut(request.line).ok_or(
                        AlignError::LineOutOfRange {
                            index: request.line,
                            count,
                        },
                    )?;
                    line.start = start;
                    line.end = end;
                }
                Err(AlignError::NoMatchAtSeed { x, y }) => {
                    log::warn!(
                        "Skipping line {}: seed ({x}, {y}) no longer matches",
                        request.line,
                    );
                    skipped += 1;
                }
                Err(error) => return Err(error),
            }
            processed += 1;
        }

        options.report(processed, total, "Alignment complete");
        Ok(AlignReport {
            outcome: AlignOutcome::Completed,
            processed,
            skipped,
        })
    }

    /// The per-request pipeline: capture, track, map to timestamps.
    fn align_request(
        &mut self,
        request: &AlignmentRequest,
    ) -> Result<(Duration, Duration), AlignError> {
        let reference = self.source.frame(request.reference_frame, true)?;
        let region =
            TrackedRegion::capture(&reference, request.x, request.y, self.config.tolerance)
                .ok_or(AlignError::NoMatchAtSeed {
                    x: request.x,
                    y: request.y,
                })?;

        let span = track_span(
            self.source,
            &region,
            request.reference_frame,
            self.config.window,
        )?;

        let start = self.timecodes.time_at_frame(span.first, TimeRounding::Start);
        let end = self.timecodes.time_at_frame(span.last, TimeRounding::End);
        Ok((start, end))
    }
}
