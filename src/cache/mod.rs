//! In-memory caches mirrored to durable storage.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bounded` | Screenshot cache, fixed capacity, insertion-order eviction |
//! | `titles` | Last-known title per tab |

// ============================================================================
// Submodules
// ============================================================================

/// Bounded screenshot cache.
pub mod bounded;

/// Tab title index.
pub mod titles;

// ============================================================================
// Re-exports
// ============================================================================

pub use bounded::{BoundedCache, CacheEntry, DEFAULT_CAPACITY};
pub use titles::TitleIndex;
