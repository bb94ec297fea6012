//! Pure Rust image backend — no system dependencies.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify (header probe) | `image::image_dimensions` |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate decoders |
//! | Downsample | `image::DynamicImage::thumbnail` |
//! | EXIF orientation | `kamadak-exif` |
//! | Rotate | `image::DynamicImage::rotate90/180/270` |
//! | Blur | `image::DynamicImage::fast_blur` |
//!
//! The `image` crate has no decode-time subsampling, so the downsample
//! hint is applied as an integer downscale immediately after decode:
//! the steady-state footprint of the result matches the hint even
//! though transient decode memory does not. Callers already may not
//! assume exact bounding, so the contract is unchanged.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::Rotation;
use image::{DynamicImage, ImageReader};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an `image` crate error onto the backend taxonomy.
///
/// Decoder-reported memory-limit errors become [`BackendError::OutOfMemory`]
/// so callers can run their recovery path; plain I/O errors keep their
/// identity; everything else is a decode failure.
fn map_image_error(path: &Path, err: image::ImageError) -> BackendError {
    match err {
        image::ImageError::Limits(_) => BackendError::OutOfMemory,
        image::ImageError::IoError(err) => BackendError::Io(err),
        other => BackendError::Decode(format!("{}: {}", path.display(), other)),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| map_image_error(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, path: &Path, downsample: u32) -> Result<DynamicImage, BackendError> {
        let image = ImageReader::open(path)
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| map_image_error(path, e))?;

        if downsample <= 1 {
            return Ok(image);
        }
        let width = (image.width() / downsample).max(1);
        let height = (image.height() / downsample).max(1);
        Ok(image.thumbnail(width, height))
    }

    fn read_orientation(&self, path: &Path) -> u32 {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                debug!("no EXIF orientation for {}: {}", path.display(), err);
                return 0;
            }
        };
        let mut reader = BufReader::new(file);
        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(data) => data
                .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
                .unwrap_or(0),
            Err(err) => {
                debug!("no EXIF orientation for {}: {}", path.display(), err);
                0
            }
        }
    }

    fn rotate(
        &self,
        image: DynamicImage,
        rotation: Rotation,
    ) -> Result<DynamicImage, BackendError> {
        Ok(match rotation {
            Rotation::None => image,
            Rotation::Deg90 => image.rotate90(),
            Rotation::Deg180 => image.rotate180(),
            Rotation::Deg270 => image.rotate270(),
        })
    }

    fn blur(&self, image: &DynamicImage, sigma: f32) -> Result<DynamicImage, BackendError> {
        Ok(image.fast_blur(sigma))
    }
}
