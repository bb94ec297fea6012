//! Decode, scale, and rotate — the per-image rendering pipeline.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Decode + downsample** | `image` decoders + `thumbnail` |
//! | **EXIF orientation** | `kamadak-exif` |
//! | **Rotate / blur** | `image::DynamicImage` |
//!
//! The module is split into:
//! - **Calculations**: pure downsample/rotation math (unit testable)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`load_scaled`], the pipeline the worker runs

pub mod backend;
mod calculations;
mod operations;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{Rotation, downsample_factor};
pub use operations::load_scaled;
pub use rust_backend::RustBackend;
