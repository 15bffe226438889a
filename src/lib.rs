//! Tab preview cache - background core of a browser tab manager.
//!
//! This library keeps screenshots and titles of browser tabs warm so that a
//! tab-manager UI can render previews instantly, while capturing as few
//! screenshots as the browser's capture quota allows.
//!
//! # Architecture
//!
//! The background process sits between a browser host and its UI surfaces:
//!
//! - **Host (browser)**: Emits tab lifecycle events, answers tab queries,
//!   captures the visible area of a window
//! - **UI (popup, overlay)**: Requests cached screenshots and titles
//!
//! Key design principles:
//!
//! - Only the active tab of a window can be captured, so captures are driven
//!   by activation and load-complete events
//! - Captures are serialized with a minimum delay between attempts
//! - Memory is the primary tier; durable storage is a best-effort mirror
//! - The screenshot cache is bounded and evicts in insertion order
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tab_preview_cache::{Background, FileStorage, Result, TabHost, TabId};
//! use tab_preview_cache::transport::RouterServer;
//!
//! async fn run(host: Arc<dyn TabHost>) -> Result<()> {
//!     let storage = FileStorage::open("./tab-cache.json").await?;
//!
//!     let background = Background::builder()
//!         .host(host)
//!         .storage(Arc::new(storage))
//!         .start()
//!         .await?;
//!
//!     // Serve UI requests and host events over a local WebSocket.
//!     let server = RouterServer::for_background(&background, 0).await?;
//!     println!("Listening on {}", server.ws_url());
//!
//!     let shot = background.router().get_screenshot(TabId::new(1)).await;
//!     println!("Cached: {}", shot.is_some());
//!
//!     server.shutdown().await;
//!     background.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`background`] | Process assembly: [`Background`], [`BackgroundBuilder`], [`Settings`] |
//! | [`cache`] | [`BoundedCache`] for screenshots, [`TitleIndex`] for titles |
//! | [`capture`] | [`RateLimitedQueue`] and [`CaptureWorker`] |
//! | [`display`] | Popup/overlay preference and overlay launcher |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | [`TabHost`] seam to the browser |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`lifecycle`] | [`TabLifecycleTracker`] and host events |
//! | [`protocol`] | Request, response and event messages |
//! | [`router`] | [`RequestRouter`] for UI requests |
//! | [`storage`] | [`Storage`] backends and the write-behind mirror |
//! | [`transport`] | WebSocket server for browser-side clients |

// ============================================================================
// Modules
// ============================================================================

/// Background process assembly.
///
/// Use [`Background::builder()`] to wire a host and storage together.
pub mod background;

/// Screenshot and title caches.
pub mod cache;

/// Rate-limited screenshot capture.
pub mod capture;

/// Display mode preference and overlay launcher.
pub mod display;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Browser host abstraction.
pub mod host;

/// Type-safe identifiers for browser entities.
pub mod identifiers;

/// Tab lifecycle event handling.
pub mod lifecycle;

/// Wire message types.
pub mod protocol;

/// Request dispatch for UI surfaces.
pub mod router;

/// Durable key-value storage.
pub mod storage;

/// WebSocket transport layer.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Background types
pub use background::{Background, BackgroundBuilder, Settings};

// Cache types
pub use cache::{BoundedCache, TitleIndex};

// Capture types
pub use capture::{
    CaptureOutcome, CaptureTicket, CaptureWorker, Capturer, ImageFormat, RateLimitedQueue,
};

// Display types
pub use display::{DisplayMode, OverlayResult};

// Error types
pub use error::{Error, Result};

// Host types
pub use host::{TabHost, TabSnapshot};

// Identifier types
pub use identifiers::{TabId, WindowId};

// Lifecycle types
pub use lifecycle::{HostEvent, TabEvent, TabLifecycleTracker};

// Router types
pub use router::RequestRouter;

// Storage types
pub use storage::{FileStorage, MemoryStorage, Storage};
