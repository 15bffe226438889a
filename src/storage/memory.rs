//! Volatile in-memory storage.

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::Result;

use super::Storage;

// ============================================================================
// MemoryStorage
// ============================================================================

/// [`Storage`] backed by a process-local map. Never fails.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<FxHashMap<String, Value>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with entries.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: Mutex::new(entries.into_iter().collect()),
        }
    }

    /// Returns the number of stored keys.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Returns a copy of a value without going through the async API.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStorage::new();
        store.set("a", json!("x")).await.expect("set");
        assert_eq!(store.get("a").await.expect("get"), Some(json!("x")));

        store.remove("a").await.expect("remove");
        assert_eq!(store.get("a").await.expect("get"), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_key_succeeds() {
        let store = MemoryStorage::new();
        assert!(store.remove("missing").await.is_ok());
    }

    #[test]
    fn test_with_entries() {
        let store = MemoryStorage::with_entries([("displayMode".to_string(), json!("overlay"))]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.peek("displayMode"), Some(json!("overlay")));
    }
}
