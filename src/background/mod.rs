//! Background process assembly.
//!
//! This module wires the caches, the capture queue and the lifecycle tracker
//! into one running process.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Background`] | Running process and owner of all shared state |
//! | [`BackgroundBuilder`] | Fluent configuration builder |
//! | [`Settings`] | Capacity, capture delay and image format |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tab_preview_cache::{Background, MemoryStorage, TabHost, TabId, TabEvent};
//!
//! # async fn example(host: Arc<dyn TabHost>) -> tab_preview_cache::Result<()> {
//! let background = Background::builder()
//!     .host(host)
//!     .storage(Arc::new(MemoryStorage::new()))
//!     .start()
//!     .await?;
//!
//! background.send_event(TabEvent::Activated { tab_id: TabId::new(7) })?;
//! let shot = background.router().get_screenshot(TabId::new(7)).await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for background configuration.
pub mod builder;

/// Core background implementation.
pub mod core;

/// Queue and cache settings.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BackgroundBuilder;
pub use core::Background;
pub use options::Settings;
