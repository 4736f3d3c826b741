//! RGB to CIE-Lab color conversion.
//!
//! Tolerance comparisons throughout the crate happen in a perceptually
//! uniform Lab-like space rather than raw RGB, so that "how different do
//! these pixels look" maps to a single Euclidean distance. The conversion
//! uses a fixed linear RGB→XYZ matrix with the D65 reference white and the
//! standard CIE piecewise cube-root mapping.
//!
//! # Example
//!
//! ```
//! use subalign::color::rgb_to_lab;
//!
//! let red = rgb_to_lab(255, 0, 0);
//! let dark_red = rgb_to_lab(200, 0, 0);
//! assert!(red.distance(&dark_red) < red.distance(&rgb_to_lab(0, 0, 255)));
//! ```

/// A color in the CIE-Lab space.
///
/// `l` is lightness (roughly 0–100 for 8-bit input); `a` and `b` are the
/// green–red and blue–yellow opponent axes. Derived from RGB on demand,
/// never stored persistently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    /// Lightness.
    pub l: f64,
    /// Green–red opponent axis.
    pub a: f64,
    /// Blue–yellow opponent axis.
    pub b: f64,
}

impl Lab {
    /// Euclidean distance between two Lab colors.
    ///
    /// This is the quantity compared against the user tolerance. The
    /// tolerance is an 8-bit value compared directly against a distance
    /// that typically falls in the 0–100+ range; the coupling is inherited
    /// behavior and deliberately not rescaled.
    pub fn distance(&self, other: &Lab) -> f64 {
        ((self.l - other.l).powi(2) + (self.a - other.a).powi(2) + (self.b - other.b).powi(2))
            .sqrt()
    }
}

/// Threshold between the cube-root and linear branches of the CIE mapping.
const CIE_EPSILON: f64 = 0.008856;

/// Piecewise f(t) used for the a and b axes.
fn cie_f(t: f64) -> f64 {
    if t > CIE_EPSILON {
        t.powf(1.0 / 3.0)
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// Convert an 8-bit RGB triple to [`Lab`].
///
/// Pure function: deterministic, no side effects, no error cases. The
/// matrix coefficients and the 0.008856 threshold must not be altered —
/// downstream tolerance behavior depends on them bit-for-bit.
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> Lab {
    let r = f64::from(r);
    let g = f64::from(g);
    let b = f64::from(b);

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / 255.0;
    let y = (0.212671 * r + 0.715160 * g + 0.072169 * b) / 255.0;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / 255.0;

    // D65 reference white.
    let xr = x / 0.950456;
    let yr = y / 1.000;
    let zr = z / 1.088854;

    let l = if yr > CIE_EPSILON {
        116.0 * yr.powf(1.0 / 3.0) - 16.0
    } else {
        903.3 * yr
    };

    Lab {
        l,
        a: 500.0 * (cie_f(xr) - cie_f(yr)),
        b: 200.0 * (cie_f(yr) - cie_f(zr)),
    }
}
