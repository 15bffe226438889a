//! Background process settings.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tab_preview_cache::Settings;
//!
//! let settings = Settings::new()
//!     .with_capacity(50)
//!     .with_capture_delay(Duration::from_secs(3))
//!     .with_jpeg_quality(60);
//!
//! assert_eq!(settings.capacity, 50);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::cache::DEFAULT_CAPACITY;
use crate::capture::{DEFAULT_CAPTURE_DELAY, DEFAULT_JPEG_QUALITY, ImageFormat};
use crate::error::{Error, Result};

// ============================================================================
// Settings
// ============================================================================

/// Tunables of the capture queue and screenshot cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Maximum number of cached screenshots.
    pub capacity: usize,

    /// Minimum delay between two capture attempts.
    pub capture_delay: Duration,

    /// Format requested from the capture API.
    pub image_format: ImageFormat,

    /// Enqueue the active tab once initialization finishes.
    pub capture_on_start: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Settings {
    /// Creates settings with the defaults: 100 entries, 2 s between
    /// captures, JPEG at quality 70.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            capture_delay: DEFAULT_CAPTURE_DELAY,
            image_format: ImageFormat::Jpeg(DEFAULT_JPEG_QUALITY),
            capture_on_start: true,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Settings {
    /// Sets the cache capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the minimum delay between captures.
    #[inline]
    #[must_use]
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Requests JPEG at the given quality (clamped to 100).
    #[inline]
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.image_format = ImageFormat::jpeg(quality);
        self
    }

    /// Sets the image format.
    #[inline]
    #[must_use]
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Enables or disables the startup capture.
    #[inline]
    #[must_use]
    pub fn with_capture_on_start(mut self, enabled: bool) -> Self {
        self.capture_on_start = enabled;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl Settings {
    /// Checks that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::config("Cache capacity must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
