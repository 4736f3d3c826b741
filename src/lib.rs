//! # subalign
//!
//! Align subtitle lines to video by tracking a user-picked key point
//! across frames.
//!
//! Given a pixel position on a reference frame — typically a corner of a
//! burned-in sign or caption — `subalign` characterizes the contiguous
//! colored region around that point, scans backward and forward through
//! the clip to find the range of frames in which a matching region
//! persists near the same location, and converts that frame range into
//! subtitle start/end timestamps through a variable-frame-rate timecode
//! table.
//!
//! ## Quick Start
//!
//! ```no_run
//! use subalign::{AlignConfig, Aligner, AlignmentRequest, RunOptions, SubtitleDocument};
//! # #[cfg(feature = "ffmpeg")]
//! use subalign::media::MediaFrameSource;
//!
//! # #[cfg(feature = "ffmpeg")]
//! # fn main() -> Result<(), subalign::AlignError> {
//! let mut source = MediaFrameSource::open("input.mkv")?;
//! let timecodes = source.scan_timecodes()?;
//! let mut document = SubtitleDocument::load_srt("input.srt")?;
//!
//! // Tolerance 8, search bounded to 500 frames in each direction.
//! let config = AlignConfig::new(8, 500, 500)?;
//! let mut queue = vec![AlignmentRequest { x: 320, y: 410, reference_frame: 1200, line: 3 }];
//!
//! let mut aligner = Aligner::new(&mut source, &timecodes, config);
//! aligner.run(&mut queue, &mut document, &RunOptions::new())?;
//! document.save_srt("aligned.srt")?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "ffmpeg"))]
//! # fn main() {}
//! ```
//!
//! ## How it works
//!
//! - **Color space** — tolerance comparisons happen in CIE-Lab
//!   ([`color`]), so one number captures perceived color difference.
//! - **Region extent** — four independent ray scans from the seed pixel
//!   produce a bounding cross ([`region`]); deliberately not a flood
//!   fill, so the comparison shape is stable and cheap.
//! - **Temporal search** — backward and forward scans probe every other
//!   frame, with a compensating re-probe at each boundary ([`search`]),
//!   tolerating up to 5 pixels of extent drift per edge.
//! - **Timestamps** — the matched range maps to a start time (inclusive)
//!   and end time (exclusive) through a [`timecode`] table; both constant
//!   and variable frame rates are supported.
//! - **Job runner** — queued picks are processed most-recent-first with
//!   progress reporting and cooperative cancellation ([`align`]).
//!
//! The core is driven entirely through the [`frame::FrameSource`] and
//! [`timecode::TimecodeTable`] traits, so it can be exercised with
//! synthetic in-memory frames; the `ffmpeg` feature adds
//! [`media::MediaFrameSource`], a real decoder-backed source, and the
//! `subalign` CLI binary.

pub mod align;
pub mod color;
pub mod error;
pub mod frame;
#[cfg(feature = "ffmpeg")]
pub mod media;
pub mod progress;
pub mod region;
pub mod search;
pub mod settings;
pub mod subtitle;
pub mod timecode;

pub use align::{AlignConfig, AlignOutcome, AlignReport, Aligner, AlignmentRequest, RunOptions};
pub use color::{Lab, rgb_to_lab};
pub use error::AlignError;
pub use frame::{FrameSource, VideoFrame};
#[cfg(feature = "ffmpeg")]
pub use media::MediaFrameSource;
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use region::{RegionExtent, region_extent};
pub use search::{EXTENT_SLACK, FrameSpan, SearchWindow, TrackedRegion, track_span};
pub use settings::AlignSettings;
pub use subtitle::{SubtitleDocument, SubtitleLine};
pub use timecode::{ConstantTimecodes, TimeRounding, TimecodeTable, VfrTimecodes};
