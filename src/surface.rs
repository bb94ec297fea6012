//! Display surfaces and load progress listeners.
//!
//! A *surface* is wherever a finished image ends up: a texture slot, a
//! widget, a framebuffer region. The manager needs exactly two things
//! from it — a way to hand over the image, and a stable identity to pin
//! latest-request-wins semantics to. [`SurfaceHandle`] supplies both by
//! pairing the caller's surface with the fingerprint of the newest
//! request aimed at it.

use crate::fingerprint::Fingerprint;
use image::DynamicImage;
use std::sync::{Arc, Mutex};

/// Destination for loaded images.
///
/// `show_image` may be called from the background worker thread, so
/// implementations must be safe to invoke off the requesting thread
/// (marshal to a UI thread inside the implementation if the toolkit
/// requires it).
pub trait DisplaySurface: Send + Sync {
    fn show_image(&self, image: Arc<DynamicImage>);
}

/// Progress callbacks around a single load request.
///
/// `cached` reports whether the request was satisfied straight from the
/// cache (`true`) or went through a background decode (`false`).
/// `after_load(false)` fires when the background attempt is over even if
/// the decode failed and nothing was delivered. Callbacks arrive on the
/// requesting thread for cache hits and on the worker thread otherwise.
pub trait LoadListener: Send + Sync {
    fn before_load(&self, cached: bool);
    fn after_load(&self, cached: bool);
}

/// A display surface paired with the fingerprint of the latest request
/// targeting it.
///
/// The fingerprint is the staleness token: the worker compares a queued
/// request against it and silently drops any request a newer one has
/// superseded. Only
/// [`ImageManager::request`](crate::manager::ImageManager::request)
/// writes it.
pub struct SurfaceHandle {
    surface: Arc<dyn DisplaySurface>,
    current: Mutex<Option<Fingerprint>>,
}

impl SurfaceHandle {
    pub fn new(surface: Arc<dyn DisplaySurface>) -> Self {
        Self {
            surface,
            current: Mutex::new(None),
        }
    }

    /// Fingerprint of the most recent request aimed at this surface.
    pub fn current_fingerprint(&self) -> Option<Fingerprint> {
        self.current.lock().unwrap().clone()
    }

    pub(crate) fn set_current(&self, fingerprint: Fingerprint) {
        *self.current.lock().unwrap() = Some(fingerprint);
    }

    pub(crate) fn is_current(&self, fingerprint: &Fingerprint) -> bool {
        self.current.lock().unwrap().as_ref() == Some(fingerprint)
    }

    pub(crate) fn show(&self, image: Arc<DynamicImage>) {
        self.surface.show_image(image);
    }
}
