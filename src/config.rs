//! Tuning knobs for [`ImageManager`](crate::manager::ImageManager).
//!
//! The one required input is the **memory ceiling**: how much memory, in
//! bytes, the embedding application is allowed overall. The cache budget
//! is a fraction of that ceiling, clamped to a sane band so that a typo
//! can neither starve the cache into uselessness nor let it swallow the
//! whole process. Discovering the ceiling itself (cgroup limits, plain
//! RAM size, a platform memory class) is the embedder's job.

/// Smallest allowed share of the memory ceiling, and the default.
pub const MIN_MEMORY_FRACTION: f64 = 0.125;

/// Largest allowed share of the memory ceiling.
pub const MAX_MEMORY_FRACTION: f64 = 0.5;

/// Gaussian sigma applied to blurred variants unless overridden.
pub const DEFAULT_BLUR_SIGMA: f32 = 12.0;

/// Immutable configuration for an image manager.
///
/// Built with [`new`](ManagerConfig::new) plus builder-style setters:
///
/// ```
/// use darkroom::ManagerConfig;
///
/// let config = ManagerConfig::new(256 * 1024 * 1024).with_memory_fraction(0.25);
/// assert_eq!(config.cache_budget(), 64 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ManagerConfig {
    memory_ceiling: usize,
    memory_fraction: f64,
    blur_sigma: f32,
}

impl ManagerConfig {
    /// Config for an application allowed `memory_ceiling` bytes overall.
    ///
    /// The cache fraction starts at [`MIN_MEMORY_FRACTION`].
    pub fn new(memory_ceiling: usize) -> Self {
        Self {
            memory_ceiling,
            memory_fraction: MIN_MEMORY_FRACTION,
            blur_sigma: DEFAULT_BLUR_SIGMA,
        }
    }

    /// Set the share of the ceiling given to the cache, clamped to
    /// `[MIN_MEMORY_FRACTION, MAX_MEMORY_FRACTION]`. Non-finite values
    /// fall back to the minimum.
    pub fn with_memory_fraction(mut self, fraction: f64) -> Self {
        self.memory_fraction = if fraction.is_finite() {
            fraction.clamp(MIN_MEMORY_FRACTION, MAX_MEMORY_FRACTION)
        } else {
            MIN_MEMORY_FRACTION
        };
        self
    }

    /// Set the Gaussian sigma used for blurred variants.
    pub fn with_blur_sigma(mut self, sigma: f32) -> Self {
        self.blur_sigma = sigma;
        self
    }

    /// Byte budget handed to the cache: `ceiling × fraction`.
    pub fn cache_budget(&self) -> usize {
        (self.memory_ceiling as f64 * self.memory_fraction) as usize
    }

    pub fn memory_ceiling(&self) -> usize {
        self.memory_ceiling
    }

    pub fn memory_fraction(&self) -> f64 {
        self.memory_fraction
    }

    pub fn blur_sigma(&self) -> f32 {
        self.blur_sigma
    }
}
