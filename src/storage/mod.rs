//! Durable key-value storage.
//!
//! The background process keeps everything authoritative in memory and
//! mirrors it into a durable store so state survives restarts.
//!
//! # Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `screenshot_<tabId>` | Data URL of the cached screenshot |
//! | `tabHeroTitleCache` | `{ "<tabId>": "<title>" }` |
//! | `displayMode` | `"popup"` or `"overlay"` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `memory` | In-process map, used in tests and as a volatile default |
//! | `file` | JSON file rewritten atomically on each mutation |
//! | `mirror` | Ordered, best-effort write-behind over any [`Storage`] |

// ============================================================================
// Submodules
// ============================================================================

/// JSON-file backed storage.
pub mod file;

/// Volatile in-memory storage.
pub mod memory;

/// Best-effort write-behind mirror.
pub mod mirror;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::TabId;

// ============================================================================
// Re-exports
// ============================================================================

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use mirror::Mirror;

// ============================================================================
// Keys
// ============================================================================

/// Prefix of per-tab screenshot keys.
pub const SCREENSHOT_KEY_PREFIX: &str = "screenshot_";

/// Aggregate key holding the whole title index.
pub const TITLE_CACHE_KEY: &str = "tabHeroTitleCache";

/// Key holding the display mode preference.
pub const DISPLAY_MODE_KEY: &str = "displayMode";

/// Returns the storage key for a tab's screenshot.
#[inline]
#[must_use]
pub fn screenshot_key(tab_id: TabId) -> String {
    format!("{SCREENSHOT_KEY_PREFIX}{tab_id}")
}

// ============================================================================
// Storage
// ============================================================================

/// Asynchronous durable key-value store.
///
/// Values are JSON so that the aggregate title index and plain strings share
/// one API. Implementations report failures; whether a failure matters is
/// decided by the caller (see [`Mirror`]).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads a value. Absent keys are `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removes a value. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
