//! Shared test utilities for the darkroom test suite.
//!
//! Provides recording doubles for the display-surface and listener
//! seams, a channel-backed listener for synchronizing with the worker
//! thread without sleeping, and small fixture helpers.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (surface, recording) = surface_pair();
//! let (listener, events) = listener_pair();
//! manager.request_with(&source, &surface, bound, modifiers, Some(listener))?;
//!
//! assert_eq!(events.recv_timeout(TIMEOUT).unwrap(), ("before", false));
//! assert_eq!(events.recv_timeout(TIMEOUT).unwrap(), ("after", false));
//! assert_eq!(recording.shown.lock().unwrap().len(), 1);
//! ```

use crate::fingerprint::{Bound, Fingerprint, Modifiers, fingerprint};
use crate::surface::{DisplaySurface, LoadListener, SurfaceHandle};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// =========================================================================
// Surface doubles
// =========================================================================

/// Display surface that records every image delivered to it.
pub struct RecordingSurface {
    pub shown: Mutex<Vec<Arc<DynamicImage>>>,
}

impl DisplaySurface for RecordingSurface {
    fn show_image(&self, image: Arc<DynamicImage>) {
        self.shown.lock().unwrap().push(image);
    }
}

/// A recording surface and the handle wrapping it.
pub fn surface_pair() -> (Arc<SurfaceHandle>, Arc<RecordingSurface>) {
    let surface = Arc::new(RecordingSurface {
        shown: Mutex::new(Vec::new()),
    });
    let handle = Arc::new(SurfaceHandle::new(
        Arc::clone(&surface) as Arc<dyn DisplaySurface>
    ));
    (handle, surface)
}

// =========================================================================
// Listener doubles
// =========================================================================

/// Listener that forwards each callback onto a channel, so tests can
/// wait for worker completion instead of sleeping.
pub struct ChannelListener {
    events: crossbeam_channel::Sender<(&'static str, bool)>,
}

impl LoadListener for ChannelListener {
    fn before_load(&self, cached: bool) {
        let _ = self.events.send(("before", cached));
    }

    fn after_load(&self, cached: bool) {
        let _ = self.events.send(("after", cached));
    }
}

/// A channel listener and the receiving end of its event stream.
pub fn listener_pair() -> (
    Arc<dyn LoadListener>,
    crossbeam_channel::Receiver<(&'static str, bool)>,
) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Arc::new(ChannelListener { events: tx }), rx)
}

// =========================================================================
// Fixtures
// =========================================================================

/// Create a file that passes source validation. Mock backends never
/// read it, so the content is arbitrary.
pub fn touch(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, b"not a real image").unwrap();
    path
}

/// Distinct fingerprint per name, for seeding caches in tests.
pub fn fp(name: &str) -> Fingerprint {
    fingerprint(Path::new(name), Bound::Pixels(500), Modifiers::none())
}
