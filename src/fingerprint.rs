//! Cache-key derivation for rendered image variants.
//!
//! Every cached image is one *variant* of a source file: the same photo
//! decoded at a different bound, or with different post-processing, is a
//! different variant and must never alias another in the cache. The
//! [`fingerprint`] function maps (source path, bound, modifiers) to a
//! stable [`Fingerprint`] that serves as the cache key and as the
//! staleness token on a display surface.
//!
//! # Design
//!
//! The key is **content-addressed by request, not by image content**:
//! hashing the path rather than the pixels keeps fingerprinting free of
//! I/O, so it can run on the caller's thread before the cache lookup.
//!
//! The digest is SHA-256 over a domain-separated encoding — a context
//! prefix, then each field with its own marker byte — so that no two
//! distinct inputs can produce the same byte stream. A plain
//! concatenation of strings (e.g. `path + size`) would let
//! `("a1", 0)` and `("a", 10)` collide. Collision resistance here is a
//! correctness aid, not a security boundary.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Maximum decoded dimension for a load request.
///
/// `Unbounded` decodes at full resolution; `Pixels(n)` asks for a
/// power-of-two downsample that brings the longest edge near `n`
/// (see [`downsample_factor`](crate::imaging::downsample_factor) for
/// the exact contract — the result may exceed `n` somewhat).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// No scaling; decode the image at its stored resolution.
    Unbounded,
    /// Longest edge should come out near this many pixels.
    Pixels(u32),
}

/// Post-processing applied to a decoded image before caching.
///
/// Each flag participates in the [`fingerprint`], so a blurred and an
/// unblurred rendering of the same source+bound occupy separate cache
/// slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Apply a fast blur after rotation.
    pub blur: bool,
}

impl Modifiers {
    /// No post-processing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Blur the decoded image.
    pub fn blurred() -> Self {
        Self { blur: true }
    }
}

/// Stable identity of one rendered variant of a source image.
///
/// Lowercase-hex SHA-256, cheap to clone and compare. Used as the cache
/// key and as the per-surface "latest request" token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint for a rendered variant.
///
/// Deterministic and pure: identical (source, bound, modifiers) always
/// yield the identical fingerprint, across calls and across process
/// restarts. Never fails.
pub fn fingerprint(source: &Path, bound: Bound, modifiers: Modifiers) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(b"variant\0");
    hasher.update(source.as_os_str().as_encoded_bytes());
    hasher.update(b"\0");
    match bound {
        Bound::Unbounded => {
            hasher.update(b"\x00");
        }
        Bound::Pixels(limit) => {
            hasher.update(b"\x01");
            hasher.update(limit.to_le_bytes());
        }
    }
    match modifiers.blur {
        true => hasher.update(b"\x01"),
        false => hasher.update(b"\x00"),
    }
    Fingerprint(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Determinism
    // =========================================================================

    #[test]
    fn identical_inputs_yield_identical_fingerprint() {
        let a = fingerprint(Path::new("/photos/dawn.jpg"), Bound::Pixels(500), Modifiers::none());
        let b = fingerprint(Path::new("/photos/dawn.jpg"), Bound::Pixels(500), Modifiers::none());
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let fp = fingerprint(Path::new("/p.jpg"), Bound::Unbounded, Modifiers::none());
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn display_matches_as_str() {
        let fp = fingerprint(Path::new("/p.jpg"), Bound::Pixels(100), Modifiers::blurred());
        assert_eq!(format!("{}", fp), fp.as_str());
    }

    // =========================================================================
    // Distinctness
    // =========================================================================

    #[test]
    fn blur_modifier_changes_fingerprint() {
        let plain = fingerprint(Path::new("/p.jpg"), Bound::Pixels(500), Modifiers::none());
        let blurred = fingerprint(Path::new("/p.jpg"), Bound::Pixels(500), Modifiers::blurred());
        assert_ne!(plain, blurred);
    }

    #[test]
    fn bound_changes_fingerprint() {
        let small = fingerprint(Path::new("/p.jpg"), Bound::Pixels(200), Modifiers::none());
        let large = fingerprint(Path::new("/p.jpg"), Bound::Pixels(800), Modifiers::none());
        assert_ne!(small, large);
    }

    #[test]
    fn unbounded_differs_from_any_pixel_bound() {
        let unbounded = fingerprint(Path::new("/p.jpg"), Bound::Unbounded, Modifiers::none());
        let bounded = fingerprint(Path::new("/p.jpg"), Bound::Pixels(0), Modifiers::none());
        assert_ne!(unbounded, bounded);
    }

    #[test]
    fn source_changes_fingerprint() {
        let a = fingerprint(Path::new("/a.jpg"), Bound::Pixels(500), Modifiers::none());
        let b = fingerprint(Path::new("/b.jpg"), Bound::Pixels(500), Modifiers::none());
        assert_ne!(a, b);
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        // Without separators, path "a1" could collide with path "a"
        // followed by bytes that happen to start with '1'.
        let a = fingerprint(Path::new("a1"), Bound::Pixels(500), Modifiers::none());
        let b = fingerprint(Path::new("a"), Bound::Pixels(500), Modifiers::none());
        assert_ne!(a, b);
    }
}
