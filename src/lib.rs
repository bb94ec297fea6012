//! # Darkroom
//!
//! Memory-budgeted image loading and caching with a single background
//! decode worker. Point it at image files on disk; it decodes them at a
//! bounded resolution, fixes their EXIF orientation, optionally blurs
//! them, caches the decoded pixels under a byte budget, and hands them to
//! your display surface — without ever blocking the requesting thread on
//! pixel work.
//!
//! # Architecture: Request Flow
//!
//! ```text
//! request(source, surface, bound)
//!   │
//!   ├── validate source          fail fast on empty/missing paths
//!   ├── fingerprint              cache key for this rendered variant
//!   ├── tag surface              staleness token: latest request wins
//!   ├── cache hit? ── yes ──►    deliver + callbacks, synchronously
//!   └── miss ──► enqueue ──►     [worker thread]
//!                                  ├── stale? skip silently
//!                                  ├── probe dims → downsample factor
//!                                  ├── decode, rotate (EXIF), blur
//!                                  ├── cache the pixels (evicting LRU)
//!                                  └── deliver from cache + after_load
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`manager`] | Public entry point — validation, cache lookup, hit/miss orchestration |
//! | [`cache`] | Byte-budgeted LRU of decoded images, with forced shrink for OOM recovery |
//! | [`fingerprint`] | Stable, content-addressed cache keys for rendered variants |
//! | [`imaging`] | Decode pipeline: dimension probe, power-of-two downsample, EXIF rotation, blur |
//! | [`surface`] | Display-surface and listener traits, per-surface staleness token |
//! | [`config`] | Memory ceiling, cache fraction, and blur tuning |
//! | `loader` (private) | FIFO queue and the single-worker drain protocol |
//!
//! # Design Decisions
//!
//! ## One Worker, Restarted on Demand
//!
//! All decodes run on at most one background thread. Decoded images are
//! enormous — a single 12-megapixel decode is ~48 MB — so running decodes
//! in parallel multiplies peak memory for little latency benefit when the
//! results land in one cache anyway. The worker is not a parked service
//! thread: it drains the queue and exits, and the next request starts a
//! fresh one. An atomic flag owns the "is a worker running" question;
//! producers send before claiming it, and a finishing worker re-checks
//! the queue after releasing it, so a request can never be stranded. A
//! panic escaping a backend or a caller's surface/listener is caught
//! per request and logged, so one poisoned image cannot silence the
//! loader for good.
//!
//! ## Content-Addressed Cache Keys
//!
//! A cache key is a SHA-256 digest of (source path, size bound,
//! post-processing modifiers) — see [`fingerprint::fingerprint`]. Distinct
//! rendered variants of one file (a thumbnail and a full-size decode, a
//! blurred backdrop and a sharp foreground) therefore never alias, and
//! there is no invalidation protocol: change an input and you simply get
//! a different key.
//!
//! ## A Byte Budget, Not an Entry Count
//!
//! Decoded images vary in size by orders of magnitude, so counting
//! entries bounds nothing. The cache tracks measured bytes per entry and
//! evicts least-recently-used until the total fits a budget fixed at
//! construction ([`ManagerConfig::cache_budget`]). On an out-of-memory
//! decode the worker forces the cache down to half budget and moves on.
//!
//! ## Latest Request Wins
//!
//! Each [`SurfaceHandle`] remembers the fingerprint of the newest request
//! aimed at it. The worker compares before decoding and silently drops
//! superseded requests. That is the whole cancellation story: no cancel
//! API, no timeouts — scrolling past ten images costs ten queue entries
//! and zero decodes for the nine you left behind.
//!
//! ## Explicit Manager Instances
//!
//! There is no process-wide singleton. The embedder constructs an
//! [`ImageManager`] from a [`ManagerConfig`] at its composition root and
//! shares it explicitly. Two managers with different budgets can coexist;
//! nothing in the crate holds global state.
//!
//! # Quick Start
//!
//! ```no_run
//! use darkroom::{Bound, DisplaySurface, DynamicImage, ImageManager, ManagerConfig, SurfaceHandle};
//! use std::sync::Arc;
//!
//! struct Viewport;
//!
//! impl DisplaySurface for Viewport {
//!     fn show_image(&self, _image: Arc<DynamicImage>) {
//!         // hand the pixels to your UI toolkit here
//!     }
//! }
//!
//! let manager = ImageManager::new(ManagerConfig::new(512 * 1024 * 1024));
//! let surface = Arc::new(SurfaceHandle::new(Arc::new(Viewport)));
//! manager.request("photos/sunset.jpg", &surface, Bound::Pixels(1600))?;
//! # Ok::<(), darkroom::RequestError>(())
//! ```

pub mod cache;
pub mod config;
pub mod fingerprint;
pub mod imaging;
mod loader;
pub mod manager;
pub mod surface;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cache::{CacheStats, ImageCache, image_byte_size};
pub use config::{DEFAULT_BLUR_SIGMA, MAX_MEMORY_FRACTION, MIN_MEMORY_FRACTION, ManagerConfig};
pub use fingerprint::{Bound, Fingerprint, Modifiers, fingerprint};
pub use imaging::{BackendError, Dimensions, ImageBackend, Rotation, RustBackend};
pub use manager::{ImageManager, RequestError};
pub use surface::{DisplaySurface, LoadListener, SurfaceHandle};

/// Decoded images are plain `image`-crate bitmaps.
pub use image::DynamicImage;
