//! Builder pattern for background configuration.
//!
//! Provides a fluent API for wiring a [`Background`] to its host and storage.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tab_preview_cache::{Background, FileStorage, TabHost};
//!
//! # async fn example(host: Arc<dyn TabHost>) -> tab_preview_cache::Result<()> {
//! let storage = FileStorage::open("./state.json").await?;
//! let background = Background::builder()
//!     .host(host)
//!     .storage(Arc::new(storage))
//!     .capacity(50)
//!     .start()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::host::TabHost;
use crate::storage::Storage;

use super::core::Background;
use super::options::Settings;

// ============================================================================
// BackgroundBuilder
// ============================================================================

/// Builder for configuring a [`Background`] instance.
///
/// Use [`Background::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct BackgroundBuilder {
    /// Browser host.
    host: Option<Arc<dyn TabHost>>,
    /// Durable key-value store.
    storage: Option<Arc<dyn Storage>>,
    /// Queue and cache tunables.
    settings: Settings,
}

impl fmt::Debug for BackgroundBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundBuilder")
            .field("host", &self.host.is_some())
            .field("storage", &self.storage.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

// ============================================================================
// BackgroundBuilder Implementation
// ============================================================================

impl BackgroundBuilder {
    /// Creates a new builder with default settings and no host or storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the browser host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: Arc<dyn TabHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the durable store.
    #[inline]
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replaces all settings.
    #[inline]
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the screenshot cache capacity.
    #[inline]
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.settings = self.settings.with_capacity(capacity);
        self
    }

    /// Sets the minimum delay between captures.
    #[inline]
    #[must_use]
    pub fn capture_delay(mut self, delay: Duration) -> Self {
        self.settings = self.settings.with_capture_delay(delay);
        self
    }

    /// Validates the configuration and starts the background process.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the host or storage is not set
    /// - [`Error::Config`] if the settings are invalid
    pub async fn start(self) -> Result<Background> {
        self.settings.validate()?;
        let host = self.validate_host()?;
        let storage = self.validate_storage()?;

        Background::start(self.settings, host, storage).await
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BackgroundBuilder {
    fn validate_host(&self) -> Result<Arc<dyn TabHost>> {
        self.host.clone().ok_or_else(|| {
            Error::config(
                "A tab host is required. Use .host() to set it.\n\
                 Example: Background::builder().host(host)",
            )
        })
    }

    fn validate_storage(&self) -> Result<Arc<dyn Storage>> {
        self.storage.clone().ok_or_else(|| {
            Error::config(
                "A storage backend is required. Use .storage() to set it.\n\
                 Example: Background::builder().storage(Arc::new(MemoryStorage::new()))",
            )
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::MemoryStorage;
    use crate::testing::FakeHost;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = BackgroundBuilder::new();
        assert!(builder.host.is_none());
        assert!(builder.storage.is_none());
        assert_eq!(builder.settings, Settings::default());
    }

    #[test]
    fn test_convenience_setters_update_settings() {
        let builder = BackgroundBuilder::new()
            .capacity(7)
            .capture_delay(Duration::from_millis(500));
        assert_eq!(builder.settings.capacity, 7);
        assert_eq!(builder.settings.capture_delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_start_fails_without_host() {
        let err = BackgroundBuilder::new()
            .storage(Arc::new(MemoryStorage::new()))
            .start()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[tokio::test]
    async fn test_start_fails_without_storage() {
        let err = BackgroundBuilder::new()
            .host(Arc::new(FakeHost::new()))
            .start()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("storage"));
    }

    #[tokio::test]
    async fn test_start_fails_with_zero_capacity() {
        let err = BackgroundBuilder::new()
            .host(Arc::new(FakeHost::new()))
            .storage(Arc::new(MemoryStorage::new()))
            .capacity(0)
            .start()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }
}
