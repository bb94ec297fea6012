//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the five platform primitives the
//! loading pipeline consumes: identify, decode, read_orientation,
//! rotate, and blur. Everything above this seam is backend-agnostic,
//! which keeps the queue/worker/cache logic testable without decoding a
//! single pixel.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) — pure Rust,
//! statically linked.

use super::calculations::Rotation;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    /// The decoder or a transform ran out of memory. Recoverable: the
    /// caller is expected to shed cache weight and drop the request.
    #[error("out of memory")]
    OutOfMemory,
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Implementations must be callable from the background worker thread,
/// hence `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Read image dimensions without a full decode (header probe).
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode an image, honoring a power-of-two downsample hint.
    ///
    /// `downsample` of 1 means full resolution. The hint is
    /// approximate; see
    /// [`downsample_factor`](super::downsample_factor).
    fn decode(&self, path: &Path, downsample: u32) -> Result<DynamicImage, BackendError>;

    /// Read the EXIF orientation code.
    ///
    /// Returns 0 when the file has no orientation tag or cannot be
    /// read; failures are swallowed by contract, never surfaced.
    fn read_orientation(&self, path: &Path) -> u32;

    /// Rotate an image.
    ///
    /// Takes the image by value: the pre-rotation buffer is consumed
    /// and released on both the success and the failure path, so peak
    /// memory stays bounded and an out-of-memory rotation never leaks
    /// the original.
    fn rotate(
        &self,
        image: DynamicImage,
        rotation: Rotation,
    ) -> Result<DynamicImage, BackendError>;

    /// Blur an image with the given sigma.
    fn blur(&self, image: &DynamicImage, sigma: f32) -> Result<DynamicImage, BackendError>;
}
