//! Key-point tracking across the frame sequence.
//!
//! [`TrackedRegion`] captures the color and extent of the region around a
//! user-picked seed point on the reference frame. [`track_span`] then scans
//! backward and forward through the clip to find the inclusive range of
//! frames in which a matching region persists near the same location.
//!
//! Matching is tolerant on two axes: pixel colors may drift within the
//! user's Lab-space tolerance, and each extent edge may move up to
//! [`EXTENT_SLACK`] pixels between frames, absorbing encoder dithering
//! around an otherwise static region.

use crate::color::{Lab, rgb_to_lab};
use crate::error::AlignError;
use crate::frame::{FrameSource, VideoFrame};
use crate::region::{RegionExtent, region_extent};

/// Maximum per-edge extent drift, in pixels, still considered the same
/// region.
pub const EXTENT_SLACK: u32 = 5;

/// Stride of the directional scans. Probing every other frame halves the
/// probe count; the post-loop re-probe in [`track_span`] recovers the frame
/// the stride may have skipped at the transition.
const PROBE_STEP: i64 = 2;

/// User-configured limits on how far the temporal search may travel from
/// the reference frame, in frames. `0` means unbounded in that direction —
/// the scan is then limited only by the clip extents.
///
/// Configured once per session and shared by every request in it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchWindow {
    /// Maximum frames to track backwards (`0` = unbounded).
    pub max_backward: u32,
    /// Maximum frames to track forwards (`0` = unbounded).
    pub max_forward: u32,
}

/// An inclusive range of frame indices.
///
/// Produced by [`track_span`]; always non-empty and always contains the
/// reference frame it was searched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    /// First matched frame.
    pub first: u64,
    /// Last matched frame.
    pub last: u64,
}

impl FrameSpan {
    /// Returns `true` when `frame` lies within the span.
    pub fn contains(&self, frame: u64) -> bool {
        self.first <= frame && frame <= self.last
    }
}

/// Mirror a y coordinate on bottom-up frames.
///
/// Returns `None` when the adjusted coordinate leaves the frame, which the
/// caller treats as "no match" rather than sampling out of bounds.
fn oriented_y(frame: &VideoFrame, y: u32) -> Option<u32> {
    if !frame.flipped() {
        return Some(y);
    }
    let mirrored = i64::from(frame.height()) - i64::from(y);
    u32::try_from(mirrored).ok()
}

/// The reference signature of a tracked key point: seed coordinates, the
/// seed pixel's Lab color, the extent of the matching region around it on
/// the reference frame, and the tolerance both were captured with.
#[derive(Debug, Clone)]
pub struct TrackedRegion {
    /// Seed x coordinate, in frame space.
    pub seed_x: u32,
    /// Seed y coordinate, in frame space (before any flip adjustment).
    pub seed_y: u32,
    /// Lab color of the seed pixel on the reference frame.
    pub color: Lab,
    /// Region extent on the reference frame.
    pub extent: RegionExtent,
    /// Lab-distance tolerance (compared as `diff <= tolerance`).
    pub tolerance: u8,
}

impl TrackedRegion {
    /// Capture the region around `(x, y)` on `frame`.
    ///
    /// Samples the seed pixel (after flip adjustment), derives its Lab
    /// color, and finds the region extent. Returns `None` when there is no
    /// match at the seed — a seed that falls outside the frame, or
    /// (defensively) a seed pixel that fails its own tolerance check.
    pub fn capture(frame: &VideoFrame, x: u32, y: u32, tolerance: u8) -> Option<Self> {
        let sample_y = oriented_y(frame, y)?;
        if !frame.contains(x, sample_y) {
            return None;
        }
        let (r, g, b) = frame.rgb_at(x, sample_y);
        let color = rgb_to_lab(r, g, b);
        let extent = region_extent(frame, x, sample_y, &color, tolerance)?;
        // The seed keeps its display-space y; every probe re-applies the
        // flip of the frame it lands on.
        Some(Self {
            seed_x: x,
            seed_y: y,
            color,
            extent,
            tolerance,
        })
    }

    /// Whether `frame` still shows this region.
    ///
    /// Re-extracts the extent at the seed coordinates (flip-adjusted for
    /// this frame) and compares it edge-by-edge against the reference
    /// extent with [`EXTENT_SLACK`] pixels of slack.
    pub fn matches_frame(&self, frame: &VideoFrame) -> bool {
        let Some(y) = oriented_y(frame, self.seed_y) else {
            return false;
        };
        match region_extent(frame, self.seed_x, y, &self.color, self.tolerance) {
            Some(extent) => extent.within_slack(&self.extent, EXTENT_SLACK),
            None => false,
        }
    }
}

/// Fetch `frame_number` from the source and test it against the region.
fn probe<S: FrameSource + ?Sized>(
    source: &mut S,
    region: &TrackedRegion,
    frame_number: u64,
) -> Result<bool, AlignError> {
    let frame = source.frame(frame_number, true)?;
    Ok(region.matches_frame(&frame))
}

/// Find the inclusive range of frames around `reference_frame` in which
/// `region` persists.
///
/// Two independent directional scans step by ±2 from the reference frame,
/// each bounded by the clip extents and its side of `window`. When a scan
/// stops, the probe index steps back one frame toward the reference, is
/// clamped to the clip and window bounds, and is probed once more: a match
/// makes it the boundary, a miss moves the boundary one frame nearer the
/// reference. That re-probe must not be skipped — it decides the frame the
/// two-frame stride jumped over.
///
/// # Errors
///
/// Returns [`AlignError::FrameOutOfRange`] when `reference_frame` is not
/// inside the clip, and propagates frame-source failures.
pub fn track_span<S: FrameSource + ?Sized>(
    source: &mut S,
    region: &TrackedRegion,
    reference_frame: u64,
    window: SearchWindow,
) -> Result<FrameSpan, AlignError> {
    let total = source.frame_count();
    if reference_frame >= total {
        return Err(AlignError::FrameOutOfRange {
            frame_number: reference_frame,
            total_frames: total,
        });
    }

    let reference = reference_frame as i64;
    let last_frame = total as i64 - 1;
    let max_backward = i64::from(window.max_backward);
    let max_forward = i64::from(window.max_forward);

    log::debug!(
        "Tracking span from frame {reference_frame} (window -{}/+{})",
        window.max_backward,
        window.max_forward,
    );

    // Backward scan.
    let mut pos = reference;
    let mut offset = 0;
    loop {
        pos -= PROBE_STEP;
        offset += PROBE_STEP;
        if pos < 0 {
            break;
        }
        if max_backward != 0 && offset > max_backward {
            break;
        }
        if !probe(source, region, pos as u64)? {
            break;
        }
    }
    pos += 1;
    pos = pos.max(0);
    if max_backward != 0 {
        pos = pos.max(reference - max_backward);
    }
    let first = if probe(source, region, pos as u64)? {
        pos
    } else {
        pos + 1
    };

    // Forward scan.
    let mut pos = reference;
    let mut offset = 0;
    loop {
        pos += PROBE_STEP;
        offset += PROBE_STEP;
        if pos > last_frame {
            break;
        }
        if max_forward != 0 && offset > max_forward {
            break;
        }
        if !probe(source, region, pos as u64)? {
            break;
        }
    }
    pos -= 1;
    pos = pos.min(last_frame);
    if max_forward != 0 {
        pos = pos.min(reference + max_forward);
    }
    let last = if probe(source, region, pos as u64)? {
        pos
    } else {
        pos - 1
    };

    let span = FrameSpan {
        first: first as u64,
        last: last as u64,
    };
    log::debug!("Matched span [{}, {}]", span.first, span.last);
    Ok(span)
}
