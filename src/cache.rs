//! Memory-budgeted cache of decoded images.
//!
//! Decoded images dwarf their encoded files — a 12-megapixel photo is
//! ~48 MB of RGBA — so the cache is bounded by a **byte budget**, not an
//! entry count. Each entry carries its measured size; inserting evicts
//! least-recently-used entries until the new total fits.
//!
//! # Design
//!
//! - **Keys** are [`Fingerprint`]s, so distinct rendered variants of the
//!   same source (different bound, blurred vs. not) occupy separate
//!   slots and never alias.
//! - **Values** are `Arc<DynamicImage>`: a `get` hands out a cheap clone
//!   and the entry can be evicted while callers still hold the image.
//! - **Budget** is fixed at construction and never resized; see
//!   [`ManagerConfig`](crate::config::ManagerConfig) for how it is
//!   derived from the platform memory ceiling.
//! - **Oversized entries** (larger than the whole budget) are refused
//!   outright rather than evicting everything for an entry that cannot
//!   fit anyway.
//! - [`free_space`](ImageCache::free_space) forcibly shrinks usage to
//!   half the budget. It is the recovery action after a decoder or
//!   transform reports out-of-memory.
//!
//! # Concurrency
//!
//! One mutex guards the whole of the LRU order, the byte tally, and the
//! counters. `get` runs on caller threads while `put`/`free_space` run
//! on the worker; with a single worker there is no contention worth
//! sharding for.

use crate::fingerprint::Fingerprint;
use image::DynamicImage;
use log::debug;
use lru::LruCache;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Measured in-memory size of a decoded image, in bytes.
///
/// This is the raw pixel buffer length (the analogue of
/// row-bytes × height), not the encoded file size.
pub fn image_byte_size(image: &DynamicImage) -> usize {
    image.as_bytes().len()
}

struct CacheEntry {
    image: Arc<DynamicImage>,
    size_bytes: usize,
}

struct Inner {
    /// Capacity-unbounded; the byte budget is the real limit.
    entries: LruCache<Fingerprint, CacheEntry>,
    total_bytes: usize,
    stats: CacheStats,
}

impl Inner {
    fn evict_one(&mut self) -> bool {
        if let Some((_, evicted)) = self.entries.pop_lru() {
            self.total_bytes -= evicted.size_bytes;
            self.stats.evictions += 1;
            true
        } else {
            false
        }
    }
}

/// LRU cache of decoded images, capped by a byte budget.
pub struct ImageCache {
    inner: Mutex<Inner>,
    budget: usize,
}

impl ImageCache {
    /// Create a cache with the given byte budget.
    pub fn new(budget: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                total_bytes: 0,
                stats: CacheStats::default(),
            }),
            budget,
        }
    }

    /// The immutable byte budget this cache was built with.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Look up a fingerprint, promoting the entry to most-recently-used.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<DynamicImage>> {
        let mut inner = self.inner.lock().unwrap();
        let image = inner
            .entries
            .get(fingerprint)
            .map(|entry| Arc::clone(&entry.image));
        match image {
            Some(image) => {
                inner.stats.hits += 1;
                Some(image)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or overwrite an entry, evicting least-recently-used
    /// entries until the total fits the budget.
    ///
    /// An entry whose `size_bytes` alone exceeds the budget is refused:
    /// the cache cannot hold it, and evicting everything else for it
    /// would only trade many useful entries for none. A refused put
    /// leaves the cache exactly as it was, including any resident entry
    /// under the same fingerprint.
    pub fn put(&self, fingerprint: Fingerprint, image: Arc<DynamicImage>, size_bytes: usize) {
        let mut inner = self.inner.lock().unwrap();

        if size_bytes > self.budget {
            debug!(
                "refusing cache entry of {} bytes (budget {})",
                size_bytes, self.budget
            );
            inner.stats.rejected += 1;
            return;
        }

        if let Some(old) = inner.entries.pop(&fingerprint) {
            inner.total_bytes -= old.size_bytes;
        }

        while inner.total_bytes + size_bytes > self.budget && inner.evict_one() {}

        inner.total_bytes += size_bytes;
        inner.stats.insertions += 1;
        inner.entries.put(fingerprint, CacheEntry { image, size_bytes });
    }

    /// Forcibly shrink usage to half the budget, oldest entries first.
    ///
    /// The out-of-memory recovery action. Callable at any time; a cache
    /// already at or under half budget (including an empty one) is left
    /// untouched.
    pub fn free_space(&self) {
        let mut inner = self.inner.lock().unwrap();
        let target = self.budget / 2;
        if inner.total_bytes <= target {
            return;
        }
        debug!(
            "shrinking image cache from {} to <= {} bytes",
            inner.total_bytes, target
        );
        while inner.total_bytes > target && inner.evict_one() {}
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current total of measured entry sizes.
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().unwrap().total_bytes
    }

    /// Snapshot of the hit/miss/eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().unwrap().stats
    }
}

/// Cache performance counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    /// Entries refused because they alone exceeded the budget.
    pub rejected: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits / {} misses, {} inserted, {} evicted",
            self.hits, self.misses, self.insertions, self.evictions
        )?;
        if self.rejected > 0 {
            write!(f, ", {} rejected", self.rejected)?;
        }
        Ok(())
    }
}
