//! The image manager: cache lookup in front, queue and worker behind.
//!
//! [`ImageManager`] is the crate's public entry point. A request runs
//! through fail-fast validation, a fingerprint computation, and a cache
//! lookup; only a miss goes anywhere near the background machinery. The
//! caller is never blocked past that lookup plus an enqueue.
//!
//! Managers are plain values owned by the embedder — construct one per
//! configuration and share it (`Arc`) wherever requests originate. There
//! is deliberately no process-wide instance. Dropping the last manager
//! handle while loads are queued is safe: the worker keeps the shared
//! state alive until it has drained.

use crate::cache::{CacheStats, ImageCache};
use crate::config::ManagerConfig;
use crate::fingerprint::{Bound, Modifiers, fingerprint};
use crate::imaging::{ImageBackend, RustBackend};
use crate::loader::{LoadRequest, Shared};
use crate::surface::{LoadListener, SurfaceHandle};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Caller mistakes reported synchronously by [`ImageManager::request`].
///
/// Decode and IO failures during the background load are not here; those
/// are contained in the worker and logged.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("empty source path")]
    EmptySource,
    #[error("source is not a readable file: {0}")]
    SourceNotFound(PathBuf),
}

/// Memory-budgeted image loader with a single background decode worker.
pub struct ImageManager<B: ImageBackend + 'static> {
    shared: Arc<Shared<B>>,
}

impl ImageManager<RustBackend> {
    /// Manager backed by the image-rs decode pipeline.
    pub fn new(config: ManagerConfig) -> Self {
        Self::with_backend(RustBackend::new(), config)
    }
}

impl<B: ImageBackend + 'static> ImageManager<B> {
    /// Manager with a caller-supplied backend. The cache budget and blur
    /// sigma come from `config`.
    pub fn with_backend(backend: B, config: ManagerConfig) -> Self {
        let cache = ImageCache::new(config.cache_budget());
        Self {
            shared: Arc::new(Shared::new(backend, cache, config.blur_sigma())),
        }
    }

    /// Request `source` rendered within `bound` onto `surface`.
    ///
    /// Shorthand for [`request_with`](Self::request_with) with no
    /// modifiers and no listener.
    pub fn request(
        &self,
        source: impl AsRef<Path>,
        surface: &Arc<SurfaceHandle>,
        bound: Bound,
    ) -> Result<(), RequestError> {
        self.request_with(source, surface, bound, Modifiers::none(), None)
    }

    /// Request a rendered variant of `source` onto `surface`.
    ///
    /// The request's fingerprint becomes the surface's current one
    /// immediately, superseding any still-queued request for the same
    /// surface. A cache hit delivers synchronously:
    /// `before_load(true)`, the image, `after_load(true)`. A miss fires
    /// `before_load(false)`, queues the decode, and returns; the worker
    /// delivers and fires `after_load(false)` later.
    pub fn request_with(
        &self,
        source: impl AsRef<Path>,
        surface: &Arc<SurfaceHandle>,
        bound: Bound,
        modifiers: Modifiers,
        listener: Option<Arc<dyn LoadListener>>,
    ) -> Result<(), RequestError> {
        let source = source.as_ref();
        if source.as_os_str().is_empty() {
            return Err(RequestError::EmptySource);
        }
        if !source.is_file() {
            return Err(RequestError::SourceNotFound(source.to_path_buf()));
        }

        let print = fingerprint(source, bound, modifiers);
        surface.set_current(print.clone());

        if let Some(image) = self.shared.cache.get(&print) {
            debug!("cache hit for {}", source.display());
            if let Some(listener) = &listener {
                listener.before_load(true);
            }
            surface.show(image);
            if let Some(listener) = &listener {
                listener.after_load(true);
            }
            return Ok(());
        }

        if let Some(listener) = &listener {
            listener.before_load(false);
        }
        self.shared.enqueue(LoadRequest {
            source: source.to_path_buf(),
            fingerprint: print,
            bound,
            modifiers,
            surface: Arc::clone(surface),
            listener,
        });
        Ok(())
    }

    /// Snapshot of the cache's hit/miss/eviction counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.shared.cache.stats()
    }

    /// The underlying cache, for inspection.
    pub fn cache(&self) -> &ImageCache {
        &self.shared.cache
    }
}
