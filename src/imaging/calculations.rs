//! Pure calculation functions for decode scaling and rotation.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use crate::fingerprint::Bound;

/// Largest sensible power-of-two exponent for a `u32` factor.
const MAX_FACTOR_EXPONENT: u32 = 31;

/// Choose the power-of-two downsample factor for decoding.
///
/// Picks `2^round(log2(longest_edge / limit))` — the factor that brings
/// the longest edge closest to the limit in log space. This is an
/// approximation: the decoded image may still come out somewhat larger
/// (or smaller) than the limit, and callers must only rely on
/// "significantly reduced for an image much larger than the bound",
/// never on exact bounding.
///
/// Returns 1 (no downsampling) for [`Bound::Unbounded`] and whenever
/// neither dimension exceeds the limit.
///
/// # Examples
/// ```
/// # use darkroom::imaging::{downsample_factor, Dimensions};
/// # use darkroom::Bound;
/// let source = Dimensions { width: 4000, height: 3000 };
/// assert_eq!(downsample_factor(source, Bound::Pixels(500)), 8);
/// assert_eq!(downsample_factor(source, Bound::Unbounded), 1);
/// ```
pub fn downsample_factor(source: Dimensions, bound: Bound) -> u32 {
    let limit = match bound {
        Bound::Unbounded => return 1,
        Bound::Pixels(limit) => limit,
    };
    let longest = source.width.max(source.height);
    if longest <= limit {
        return 1;
    }

    // Saturating float-to-int casts keep degenerate limits (e.g. 0,
    // where the ratio is infinite) from overflowing the shift.
    let exponent = (longest as f64 / limit as f64).log2().round() as u32;
    1u32 << exponent.min(MAX_FACTOR_EXPONENT)
}

/// Image rotation derived from an EXIF orientation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Map an EXIF orientation code to a rotation.
    ///
    /// Only the three pure-rotation codes are honored: 3 → 180°,
    /// 6 → 90°, 8 → 270°. Every other code (including the mirrored
    /// orientations 2/4/5/7, the canonical 1, and the 0 used for
    /// "absent") is a no-op passthrough.
    pub fn from_exif(code: u32) -> Self {
        match code {
            3 => Rotation::Deg180,
            6 => Rotation::Deg90,
            8 => Rotation::Deg270,
            _ => Rotation::None,
        }
    }

    /// Clockwise degrees this rotation applies.
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}
