//! Region extent finding around a seed pixel.
//!
//! Given a seed coordinate and a reference color, [`region_extent`] finds
//! the axis-aligned bounding cross of the tolerance-matching region: four
//! independent ray scans (right, left, down, up) from the seed, each
//! stopping just before the first pixel whose Lab distance from the
//! reference exceeds the tolerance. The scans are deliberately independent
//! — this is a bounding cross, not a flood fill, and downstream extent
//! comparisons assume exactly this shape.

use crate::color::{Lab, rgb_to_lab};
use crate::frame::VideoFrame;

/// The bounding cross of a tolerance-matching region around a seed pixel.
///
/// All four values are absolute pixel coordinates in the frame:
/// `left <= seed.x <= right` and `up <= seed.y <= down`, with `left`/`right`
/// in `[0, width)` and `up`/`down` in `[0, height)`. Computed fresh for
/// every probed frame and never persisted across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionExtent {
    /// Leftmost matching column.
    pub left: u32,
    /// Rightmost matching column.
    pub right: u32,
    /// Topmost matching row.
    pub up: u32,
    /// Bottommost matching row.
    pub down: u32,
}

impl RegionExtent {
    /// Returns `true` when every edge of `self` lies within `slack` pixels
    /// of the corresponding edge of `other`.
    pub fn within_slack(&self, other: &RegionExtent, slack: u32) -> bool {
        self.left.abs_diff(other.left) <= slack
            && self.right.abs_diff(other.right) <= slack
            && self.up.abs_diff(other.up) <= slack
            && self.down.abs_diff(other.down) <= slack
    }
}

/// Whether the pixel at `(x, y)` matches `reference` within `tolerance`.
///
/// The tolerance is compared directly against the Lab-space Euclidean
/// distance (`diff <= tolerance`).
fn pixel_matches(frame: &VideoFrame, x: u32, y: u32, reference: &Lab, tolerance: u8) -> bool {
    let (r, g, b) = frame.rgb_at(x, y);
    rgb_to_lab(r, g, b).distance(reference) <= f64::from(tolerance)
}

/// Find the extent of the tolerance-matching region around `(x, y)`.
///
/// Returns `None` when the seed pixel itself does not match `reference`
/// within `tolerance` — the "no match at seed" signal — or when the seed
/// lies outside the frame entirely (which can happen after the
/// vertical-flip adjustment on bottom-up frames).
///
/// Each of the four scans walks single pixels along its row or column,
/// stopping at the first non-matching pixel; the bound is the coordinate
/// just before it, or the frame edge if every pixel to the edge matches.
/// A seed on the frame boundary terminates the outward scan immediately
/// with the boundary as the bound.
pub fn region_extent(
    frame: &VideoFrame,
    x: u32,
    y: u32,
    reference: &Lab,
    tolerance: u8,
) -> Option<RegionExtent> {
    if !frame.contains(x, y) {
        return None;
    }
    if !pixel_matches(frame, x, y, reference, tolerance) {
        return None;
    }

    let width = frame.width();
    let height = frame.height();

    let mut right = width - 1;
    for i in x + 1..width {
        if !pixel_matches(frame, i, y, reference, tolerance) {
            right = i - 1;
            break;
        }
    }

    let mut left = 0;
    for i in (0..x).rev() {
        if !pixel_matches(frame, i, y, reference, tolerance) {
            left = i + 1;
            break;
        }
    }

    let mut down = height - 1;
    for i in y + 1..height {
        if !pixel_matches(frame, x, i, reference, tolerance) {
            down = i - 1;
            break;
        }
    }

    let mut up = 0;
    for i in (0..y).rev() {
        if !pixel_matches(frame, x, i, reference, tolerance) {
            up = i + 1;
            break;
        }
    }

    Some(RegionExtent {
        left,
        right,
        up,
        down,
    })
}
