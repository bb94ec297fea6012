//! High-level decode pipeline.
//!
//! Combines the pure calculations with backend execution: probe the
//! source dimensions, choose a downsample factor, decode, honor the
//! EXIF orientation, and apply post-processing modifiers. This is the
//! whole per-image rendering path; the background worker calls exactly
//! one function here.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{Rotation, downsample_factor};
use crate::fingerprint::{Bound, Modifiers};
use image::DynamicImage;
use log::{debug, warn};
use std::path::Path;

/// Decode a source image scaled to the given bound, rotated per its
/// EXIF orientation, with modifiers applied.
///
/// Failure modes: probe/decode errors and rotation errors propagate
/// (rotation consumes the decoded buffer either way, so an
/// out-of-memory rotation cannot leak it). A failing blur does **not**
/// fail the load: the unfiltered image is returned and a warning is
/// logged, since a sharp image beats a missing one.
pub fn load_scaled(
    backend: &impl ImageBackend,
    source: &Path,
    bound: Bound,
    modifiers: Modifiers,
    blur_sigma: f32,
) -> Result<DynamicImage, BackendError> {
    let dims = backend.identify(source)?;
    let factor = downsample_factor(dims, bound);
    debug!(
        "decoding {} ({}x{}) at 1/{}",
        source.display(),
        dims.width,
        dims.height,
        factor
    );

    let decoded = backend.decode(source, factor)?;

    let rotated = match Rotation::from_exif(backend.read_orientation(source)) {
        Rotation::None => decoded,
        rotation => backend.rotate(decoded, rotation)?,
    };

    if !modifiers.blur {
        return Ok(rotated);
    }
    match backend.blur(&rotated, blur_sigma) {
        Ok(blurred) => Ok(blurred),
        Err(err) => {
            warn!(
                "blur failed for {}; using unfiltered image: {}",
                source.display(),
                err
            );
            Ok(rotated)
        }
    }
}
