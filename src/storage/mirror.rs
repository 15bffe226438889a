//! Best-effort write-behind mirror.
//!
//! Callers mutate in-memory state synchronously and hand the durable copy to
//! the [`Mirror`]. Writes are queued on an unbounded channel and applied in
//! order by a single background task, so a `set` followed by a `remove` of
//! the same key can never land reversed.
//!
//! Failures are logged at debug level and dropped. They never roll back the
//! in-memory mutation and are never retried.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::Storage;

// ============================================================================
// MirrorOp
// ============================================================================

/// Internal commands for the writer task.
enum MirrorOp {
    /// Write a value.
    Set { key: String, value: Value },
    /// Remove a value.
    Remove { key: String },
    /// Acknowledge once every earlier op has been applied.
    Flush(oneshot::Sender<()>),
}

// ============================================================================
// Mirror
// ============================================================================

/// Ordered, fire-and-forget writer over a [`Storage`].
///
/// Cheap to clone; all clones feed the same writer task. The task exits when
/// the last clone is dropped.
#[derive(Clone)]
pub struct Mirror {
    ops_tx: mpsc::UnboundedSender<MirrorOp>,
    store: Arc<dyn Storage>,
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("closed", &self.ops_tx.is_closed())
            .finish_non_exhaustive()
    }
}

impl Mirror {
    /// Creates a mirror and spawns its writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn Storage>) -> Self {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_writer(Arc::clone(&store), ops_rx));
        Self { ops_tx, store }
    }

    /// Schedules a write. Returns immediately.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if self.ops_tx.send(MirrorOp::Set { key, value }).is_err() {
            debug!("Mirror writer gone, dropping set");
        }
    }

    /// Schedules a removal. Returns immediately.
    pub fn remove(&self, key: impl Into<String>) {
        let key = key.into();
        if self.ops_tx.send(MirrorOp::Remove { key }).is_err() {
            debug!("Mirror writer gone, dropping remove");
        }
    }

    /// Waits until every write scheduled before this call has been applied
    /// (or has failed).
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.ops_tx.send(MirrorOp::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Reads a value straight from the store.
    ///
    /// Read failures degrade to a miss.
    pub async fn read(&self, key: &str) -> Option<Value> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                debug!(key, error = %e, "Mirror read failed");
                None
            }
        }
    }

    /// Writer loop. Applies ops strictly in arrival order.
    async fn run_writer(store: Arc<dyn Storage>, mut ops_rx: mpsc::UnboundedReceiver<MirrorOp>) {
        while let Some(op) = ops_rx.recv().await {
            match op {
                MirrorOp::Set { key, value } => {
                    if let Err(e) = store.set(&key, value).await {
                        debug!(key = %key, error = %e, "Mirror write failed");
                    }
                }
                MirrorOp::Remove { key } => {
                    if let Err(e) = store.remove(&key).await {
                        debug!(key = %key, error = %e, "Mirror remove failed");
                    }
                }
                MirrorOp::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }

        debug!("Mirror writer terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::storage::MemoryStorage;
    use crate::testing::RecordingStorage;

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let store = Arc::new(MemoryStorage::new());
        let mirror = Mirror::spawn(store.clone());

        mirror.set("k", json!("first"));
        mirror.remove("k");
        mirror.set("k", json!("second"));
        mirror.flush().await;

        assert_eq!(store.peek("k"), Some(json!("second")));
    }

    #[tokio::test]
    async fn test_failed_writes_are_swallowed() {
        let store = Arc::new(RecordingStorage::new());
        store.fail_writes(true);
        let mirror = Mirror::spawn(store.clone());

        mirror.set("k", json!(1));
        mirror.remove("k");
        mirror.flush().await;

        assert_eq!(store.set_count("k"), 1);
        assert_eq!(store.remove_count("k"), 1);
        assert_eq!(store.inner().peek("k"), None);
    }

    #[tokio::test]
    async fn test_failed_reads_degrade_to_miss() {
        let store = Arc::new(RecordingStorage::new());
        store.inner().set("k", json!("v")).await.expect("seed");
        store.fail_reads(true);
        let mirror = Mirror::spawn(store);

        assert_eq!(mirror.read("k").await, None);
    }
}
