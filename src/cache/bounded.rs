//! Fixed-capacity screenshot cache with insertion-order eviction.
//!
//! # Eviction
//!
//! The eviction candidate is the earliest-inserted key still present, not the
//! least recently used one. Overwriting a key keeps its original position.
//! Reads never reorder anything.
//!
//! # Durability
//!
//! Every mutation is mirrored to `screenshot_<tabId>` through the
//! best-effort [`Mirror`]. The in-memory entry is authoritative while
//! present; [`BoundedCache::get`] never touches the mirror.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::identifiers::TabId;
use crate::storage::{Mirror, screenshot_key};

// ============================================================================
// Constants
// ============================================================================

/// Default number of cached screenshots.
pub const DEFAULT_CAPACITY: usize = 100;

// ============================================================================
// CacheEntry
// ============================================================================

/// A cached screenshot.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Encoded image as a data URL.
    pub value: Arc<str>,
    /// When the entry was first inserted.
    pub inserted_at: Instant,
}

// ============================================================================
// BoundedCache
// ============================================================================

/// Bounded in-memory screenshot cache backed by a durable mirror.
pub struct BoundedCache {
    entries: Mutex<IndexMap<TabId, CacheEntry>>,
    capacity: usize,
    mirror: Mirror,
}

impl std::fmt::Debug for BoundedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("size", &self.size())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl BoundedCache {
    /// Creates an empty cache. A capacity of zero is treated as one.
    pub fn new(capacity: usize, mirror: Mirror) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(IndexMap::with_capacity(capacity + 1)),
            capacity,
            mirror,
        }
    }

    /// Returns the configured capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of cached entries.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if `key` is cached in memory.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: TabId) -> bool {
        self.entries.lock().contains_key(&key)
    }

    /// Looks up a screenshot in memory only.
    #[must_use]
    pub fn get(&self, key: TabId) -> Option<Arc<str>> {
        self.entries.lock().get(&key).map(|e| Arc::clone(&e.value))
    }

    /// Returns the cached keys oldest first.
    #[must_use]
    pub fn keys(&self) -> Vec<TabId> {
        self.entries.lock().keys().copied().collect()
    }

    /// Inserts or overwrites a screenshot, evicting the oldest entry if the
    /// cache grew past capacity.
    ///
    /// Returns the evicted key, if any.
    pub fn put(&self, key: TabId, value: impl Into<Arc<str>>) -> Option<TabId> {
        let value = value.into();
        let mirrored = Value::String(value.to_string());

        let evicted = {
            let mut entries = self.entries.lock();
            match entries.get_mut(&key) {
                Some(entry) => entry.value = value,
                None => {
                    entries.insert(
                        key,
                        CacheEntry {
                            value,
                            inserted_at: Instant::now(),
                        },
                    );
                }
            }

            self.mirror.set(screenshot_key(key), mirrored);

            // Mirror ops are issued under the lock so they land in mutation order.
            let evicted = if entries.len() > self.capacity {
                entries.shift_remove_index(0).map(|(oldest, _)| oldest)
            } else {
                None
            };
            if let Some(oldest) = evicted {
                self.mirror.remove(screenshot_key(oldest));
            }
            evicted
        };

        if let Some(oldest) = evicted {
            debug!(tab_id = %oldest, "Evicted oldest screenshot");
        }

        evicted
    }

    /// Removes a screenshot from memory and from the mirror.
    ///
    /// Returns `true` if it was cached in memory. The mirror removal is issued
    /// either way; durable entries can outlive their memory counterpart.
    pub fn delete(&self, key: TabId) -> bool {
        let mut entries = self.entries.lock();
        let removed = entries.shift_remove(&key).is_some();
        self.mirror.remove(screenshot_key(key));
        removed
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::storage::MemoryStorage;
    use crate::testing::RecordingStorage;

    fn cache_with(capacity: usize) -> (BoundedCache, Arc<MemoryStorage>) {
        let store = Arc::new(MemoryStorage::new());
        let mirror = Mirror::spawn(store.clone());
        (BoundedCache::new(capacity, mirror), store)
    }

    fn id(n: u32) -> TabId {
        TabId::new(n)
    }

    #[tokio::test]
    async fn test_third_put_evicts_first_with_capacity_two() {
        let (cache, _) = cache_with(2);

        assert_eq!(cache.put(id(1), "a"), None);
        assert_eq!(cache.put(id(2), "b"), None);
        assert_eq!(cache.put(id(3), "c"), Some(id(1)));

        assert_eq!(cache.get(id(1)), None);
        assert_eq!(cache.get(id(2)).as_deref(), Some("b"));
        assert_eq!(cache.get(id(3)).as_deref(), Some("c"));
        assert_eq!(cache.size(), 2);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_insertion_position() {
        let (cache, _) = cache_with(2);

        cache.put(id(1), "a");
        cache.put(id(2), "b");
        cache.put(id(1), "a2");
        let evicted = cache.put(id(3), "c");

        assert_eq!(evicted, Some(id(1)));
        assert_eq!(cache.keys(), vec![id(2), id(3)]);
    }

    #[tokio::test]
    async fn test_reads_do_not_refresh_eviction_order() {
        let (cache, _) = cache_with(2);

        cache.put(id(1), "a");
        cache.put(id(2), "b");
        let _ = cache.get(id(1));
        cache.put(id(3), "c");

        assert!(!cache.contains(id(1)));
        assert!(cache.contains(id(2)));
    }

    #[tokio::test]
    async fn test_eviction_removes_mirror_copy() {
        let (cache, store) = cache_with(1);

        cache.put(id(1), "a");
        cache.put(id(2), "b");
        cache.mirror.flush().await;

        assert_eq!(store.peek("screenshot_1"), None);
        assert_eq!(store.peek("screenshot_2"), Some(json!("b")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_puts_leave_mirror_matching_memory() {
        let (cache, store) = cache_with(2);
        let cache = Arc::new(cache);

        let writers: Vec<_> = (0..4u32)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..500u32 {
                        cache.put(id((i + t) % 5), "v");
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread");
        }
        cache.mirror.flush().await;

        for n in 0..5 {
            assert_eq!(
                store.peek(&screenshot_key(id(n))).is_some(),
                cache.contains(id(n)),
                "durable copy of tab {n} out of step with memory"
            );
        }
    }

    #[tokio::test]
    async fn test_delete_removes_both_tiers() {
        let (cache, store) = cache_with(4);

        cache.put(id(7), "x");
        assert!(cache.delete(id(7)));
        assert!(!cache.delete(id(7)));
        cache.mirror.flush().await;

        assert_eq!(cache.get(id(7)), None);
        assert_eq!(store.peek("screenshot_7"), None);
    }

    #[tokio::test]
    async fn test_mirror_failure_does_not_roll_back() {
        let store = Arc::new(RecordingStorage::new());
        store.fail_writes(true);
        let mirror = Mirror::spawn(store.clone());
        let cache = BoundedCache::new(4, mirror.clone());

        cache.put(id(1), "a");
        mirror.flush().await;

        assert_eq!(cache.get(id(1)).as_deref(), Some("a"));
        assert_eq!(store.set_count("screenshot_1"), 1);
    }

    proptest! {
        #[test]
        fn prop_size_never_exceeds_capacity(
            capacity in 1usize..8,
            keys in proptest::collection::vec(0u32..20, 0..64),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");

            rt.block_on(async {
                let (cache, _) = cache_with(capacity);
                let mut order: Vec<u32> = Vec::new();

                for key in keys {
                    let evicted = cache.put(id(key), "v");
                    if !order.contains(&key) {
                        order.push(key);
                    }
                    if order.len() > capacity {
                        let oldest = order.remove(0);
                        prop_assert_eq!(evicted, Some(id(oldest)));
                    } else {
                        prop_assert_eq!(evicted, None);
                    }
                    prop_assert!(cache.size() <= capacity);
                }
                Ok(())
            })?;
        }
    }
}
