//! Last-known tab titles.
//!
//! Tabs briefly report blank titles while navigating. The UI shows the last
//! non-blank title instead, which this index keeps per tab. The whole index
//! is persisted as one JSON object under `tabHeroTitleCache` after every
//! mutation; an empty index removes the key.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::host::TabSnapshot;
use crate::identifiers::TabId;
use crate::storage::{Mirror, TITLE_CACHE_KEY};

// ============================================================================
// TitleIndex
// ============================================================================

/// Tab identity → last non-blank title.
pub struct TitleIndex {
    titles: Mutex<FxHashMap<TabId, String>>,
    mirror: Mirror,
}

impl TitleIndex {
    /// Creates an empty index.
    pub fn new(mirror: Mirror) -> Self {
        Self {
            titles: Mutex::new(FxHashMap::default()),
            mirror,
        }
    }

    /// Returns the number of indexed tabs.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.titles.lock().len()
    }

    /// Returns `true` if no titles are indexed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.titles.lock().is_empty()
    }

    /// Returns the cached title of a tab.
    #[must_use]
    pub fn get(&self, key: TabId) -> Option<String> {
        self.titles.lock().get(&key).cloned()
    }

    /// Returns the cached titles of the given tabs. Tabs without a title are
    /// omitted.
    #[must_use]
    pub fn get_many(&self, keys: &[TabId]) -> BTreeMap<TabId, String> {
        let titles = self.titles.lock();
        keys.iter()
            .filter_map(|key| titles.get(key).map(|t| (*key, t.clone())))
            .collect()
    }

    /// Records a title if it is non-blank and differs from the cached one.
    ///
    /// Returns `true` if the index changed (and a flush was scheduled).
    pub fn record_title(&self, key: TabId, raw_title: &str) -> bool {
        let trimmed = raw_title.trim();
        if trimmed.is_empty() {
            return false;
        }

        let mut titles = self.titles.lock();
        if titles.get(&key).is_some_and(|t| t == trimmed) {
            return false;
        }

        titles.insert(key, trimmed.to_string());
        self.flush_locked(&titles);
        true
    }

    /// Forgets a tab. Returns `true` if it had a title.
    pub fn remove(&self, key: TabId) -> bool {
        let mut titles = self.titles.lock();
        if titles.remove(&key).is_none() {
            return false;
        }

        self.flush_locked(&titles);
        true
    }

    /// Moves the title of `old_key` to `new_key` after the host replaced one
    /// tab identity with another.
    ///
    /// Returns `false` (and does nothing) if `old_key` had no title.
    pub fn transfer(&self, old_key: TabId, new_key: TabId) -> bool {
        let mut titles = self.titles.lock();
        let Some(title) = titles.remove(&old_key) else {
            return false;
        };

        titles.insert(new_key, title);
        self.flush_locked(&titles);
        debug!(old_tab_id = %old_key, new_tab_id = %new_key, "Title transferred");
        true
    }

    /// Seeds the index from the persisted record without flushing.
    ///
    /// Keys that are not tab IDs and blank or non-string values are skipped.
    /// Returns the number of titles loaded.
    pub async fn load(&self) -> usize {
        let Some(Value::Object(stored)) = self.mirror.read(TITLE_CACHE_KEY).await else {
            return 0;
        };

        let mut titles = self.titles.lock();
        let mut loaded = 0;
        for (key, value) in stored {
            let Ok(tab_id) = key.parse::<TabId>() else {
                continue;
            };
            let Some(title) = value.as_str().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };
            titles.insert(tab_id, title.to_string());
            loaded += 1;
        }
        loaded
    }

    /// Repairs the index against a live snapshot of open tabs.
    ///
    /// Flushes once if anything changed. Returns the number of updated tabs.
    pub fn reconcile(&self, tabs: &[TabSnapshot]) -> usize {
        let mut titles = self.titles.lock();
        let mut updated = 0;

        for tab in tabs {
            let Some(title) = tab.usable_title() else {
                continue;
            };
            if titles.get(&tab.id).is_some_and(|t| t == title) {
                continue;
            }
            titles.insert(tab.id, title.to_string());
            updated += 1;
        }

        if updated > 0 {
            self.flush_locked(&titles);
        }
        updated
    }

    /// Schedules a write of the whole index. Called with the lock held so
    /// flushes reach the mirror in mutation order.
    fn flush_locked(&self, titles: &FxHashMap<TabId, String>) {
        if titles.is_empty() {
            self.mirror.remove(TITLE_CACHE_KEY);
            return;
        }

        let payload: Map<String, Value> = titles
            .iter()
            .map(|(id, title)| (id.to_string(), Value::String(title.clone())))
            .collect();
        self.mirror.set(TITLE_CACHE_KEY, Value::Object(payload));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::json;

    use crate::identifiers::WindowId;
    use crate::storage::Storage;
    use crate::testing::RecordingStorage;

    fn index() -> (TitleIndex, Arc<RecordingStorage>, Mirror) {
        let store = Arc::new(RecordingStorage::new());
        let mirror = Mirror::spawn(store.clone());
        (TitleIndex::new(mirror.clone()), store, mirror)
    }

    fn id(n: u32) -> TabId {
        TabId::new(n)
    }

    #[tokio::test]
    async fn test_repeated_title_flushes_once() {
        let (titles, store, mirror) = index();

        assert!(titles.record_title(id(1), "Example"));
        assert!(!titles.record_title(id(1), "Example"));
        mirror.flush().await;

        assert_eq!(store.set_count(TITLE_CACHE_KEY), 1);
    }

    #[tokio::test]
    async fn test_title_is_trimmed_and_blank_ignored() {
        let (titles, store, mirror) = index();

        assert!(!titles.record_title(id(1), "   "));
        assert!(titles.record_title(id(1), "  Docs  "));
        assert!(!titles.record_title(id(1), "Docs"));
        mirror.flush().await;

        assert_eq!(titles.get(id(1)).as_deref(), Some("Docs"));
        assert_eq!(store.set_count(TITLE_CACHE_KEY), 1);
    }

    #[tokio::test]
    async fn test_transfer_moves_title() {
        let (titles, store, mirror) = index();

        titles.record_title(id(1), "Docs");
        assert!(titles.transfer(id(1), id(2)));
        mirror.flush().await;

        assert_eq!(titles.get(id(2)).as_deref(), Some("Docs"));
        assert_eq!(titles.get(id(1)), None);
        assert_eq!(
            store.inner().peek(TITLE_CACHE_KEY),
            Some(json!({ "2": "Docs" }))
        );
    }

    #[tokio::test]
    async fn test_transfer_without_title_is_noop() {
        let (titles, store, mirror) = index();

        assert!(!titles.transfer(id(1), id(2)));
        mirror.flush().await;

        assert_eq!(titles.get(id(2)), None);
        assert_eq!(store.set_count(TITLE_CACHE_KEY), 0);
    }

    #[tokio::test]
    async fn test_removing_last_title_deletes_record() {
        let (titles, store, mirror) = index();

        titles.record_title(id(1), "Only");
        assert!(titles.remove(id(1)));
        assert!(!titles.remove(id(1)));
        mirror.flush().await;

        assert_eq!(store.inner().peek(TITLE_CACHE_KEY), None);
        assert_eq!(store.remove_count(TITLE_CACHE_KEY), 1);
    }

    #[tokio::test]
    async fn test_get_many_omits_misses() {
        let (titles, _, _) = index();

        titles.record_title(id(1), "One");
        titles.record_title(id(3), "Three");

        let found = titles.get_many(&[id(1), id(2), id(3)]);
        assert_eq!(found.len(), 2);
        assert_eq!(found.get(&id(1)).map(String::as_str), Some("One"));
        assert!(!found.contains_key(&id(2)));
    }

    #[tokio::test]
    async fn test_load_skips_invalid_entries_without_flushing() {
        let store = Arc::new(RecordingStorage::new());
        store
            .inner()
            .set(
                TITLE_CACHE_KEY,
                json!({ "1": "Mail", "abc": "Bad key", "2": "   ", "3": 42 }),
            )
            .await
            .expect("seed");
        let mirror = Mirror::spawn(store.clone());
        let titles = TitleIndex::new(mirror.clone());

        assert_eq!(titles.load().await, 1);
        mirror.flush().await;

        assert_eq!(titles.get(id(1)).as_deref(), Some("Mail"));
        assert_eq!(store.set_count(TITLE_CACHE_KEY), 0);
    }

    #[tokio::test]
    async fn test_reconcile_repairs_stale_titles() {
        let (titles, store, mirror) = index();
        titles.record_title(id(1), "Old");
        titles.record_title(id(2), "Same");
        mirror.flush().await;
        let before = store.set_count(TITLE_CACHE_KEY);

        let window = WindowId::new(1);
        let live = vec![
            TabSnapshot::new(id(1), window, false).with_title("New"),
            TabSnapshot::new(id(2), window, false).with_title("Same"),
            TabSnapshot::new(id(3), window, true).with_title(""),
        ];

        assert_eq!(titles.reconcile(&live), 1);
        mirror.flush().await;

        assert_eq!(titles.get(id(1)).as_deref(), Some("New"));
        assert_eq!(titles.get(id(3)), None);
        assert_eq!(store.set_count(TITLE_CACHE_KEY), before + 1);
    }
}
