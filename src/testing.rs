//! Test doubles shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::capture::ImageFormat;
use crate::display::DisplayMode;
use crate::error::{Error, Result};
use crate::host::{TabHost, TabSnapshot};
use crate::identifiers::{TabId, WindowId};
use crate::storage::{MemoryStorage, Storage};

/// Installs a test subscriber once. Honors `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Payload every fake capture returns.
pub(crate) fn fake_data_url(format: ImageFormat) -> String {
    format!("data:{};base64,QUJDRA==", format.mime_type())
}

// ============================================================================
// FakeHost
// ============================================================================

/// Host call log entry. Captures are recorded separately with timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostCall {
    InjectOverlay(TabId),
    OpenPopup,
    SetPresentation(DisplayMode),
}

/// In-memory browser with scripted failures.
#[derive(Default)]
pub(crate) struct FakeHost {
    tabs: Mutex<IndexMap<TabId, TabSnapshot>>,
    calls: Mutex<Vec<HostCall>>,
    captures: Mutex<Vec<(WindowId, Instant)>>,
    capture_error: Mutex<Option<String>>,
    overlay_error: Mutex<Option<String>>,
    overlay_stalled: AtomicBool,
    capture_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_tab(&self, tab: TabSnapshot) {
        self.tabs.lock().insert(tab.id, tab);
    }

    pub(crate) fn remove_tab(&self, tab_id: TabId) {
        self.tabs.lock().shift_remove(&tab_id);
    }

    pub(crate) fn set_active(&self, tab_id: TabId, active: bool) {
        if let Some(tab) = self.tabs.lock().get_mut(&tab_id) {
            tab.active = active;
        }
    }

    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn capture_times(&self) -> Vec<Instant> {
        self.captures.lock().iter().map(|(_, at)| *at).collect()
    }

    pub(crate) fn capture_count(&self) -> usize {
        self.captures.lock().len()
    }

    pub(crate) fn fail_captures(&self, message: &str) {
        *self.capture_error.lock() = Some(message.to_string());
    }

    pub(crate) fn fail_overlay(&self, message: &str) {
        *self.overlay_error.lock() = Some(message.to_string());
    }

    /// Makes every overlay injection hang forever.
    pub(crate) fn stall_overlay(&self) {
        self.overlay_stalled.store(true, Ordering::SeqCst);
    }

    /// Makes every capture wait for a notification on the returned gate.
    pub(crate) fn hold_captures(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.capture_gate.lock() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl TabHost for FakeHost {
    async fn get_tab(&self, tab_id: TabId) -> Result<Option<TabSnapshot>> {
        Ok(self.tabs.lock().get(&tab_id).cloned())
    }

    async fn query_tabs(&self) -> Result<Vec<TabSnapshot>> {
        Ok(self.tabs.lock().values().cloned().collect())
    }

    async fn active_tab(&self) -> Result<Option<TabSnapshot>> {
        Ok(self.tabs.lock().values().find(|t| t.active).cloned())
    }

    async fn capture_visible_tab(
        &self,
        window_id: WindowId,
        format: ImageFormat,
    ) -> Result<String> {
        self.captures.lock().push((window_id, Instant::now()));

        let gate = self.capture_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(message) = self.capture_error.lock().clone() {
            return Err(Error::host(message));
        }
        Ok(fake_data_url(format))
    }

    async fn inject_overlay(&self, tab_id: TabId) -> Result<()> {
        self.calls.lock().push(HostCall::InjectOverlay(tab_id));
        if self.overlay_stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        match self.overlay_error.lock().clone() {
            Some(message) => Err(Error::host(message)),
            None => Ok(()),
        }
    }

    async fn open_popup(&self) -> Result<()> {
        self.calls.lock().push(HostCall::OpenPopup);
        Ok(())
    }

    async fn set_action_presentation(&self, mode: DisplayMode) -> Result<()> {
        self.calls.lock().push(HostCall::SetPresentation(mode));
        Ok(())
    }
}

// ============================================================================
// RecordingStorage
// ============================================================================

/// [`MemoryStorage`] wrapper that counts operations per key and can fail.
#[derive(Default)]
pub(crate) struct RecordingStorage {
    inner: MemoryStorage,
    sets: Mutex<FxHashMap<String, usize>>,
    removes: Mutex<FxHashMap<String, usize>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl RecordingStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_count(&self, key: &str) -> usize {
        self.sets.lock().get(key).copied().unwrap_or_default()
    }

    pub(crate) fn remove_count(&self, key: &str) -> usize {
        self.removes.lock().get(key).copied().unwrap_or_default()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage(key, "read rejected"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        *self.sets.lock().entry(key.to_string()).or_default() += 1;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage(key, "write rejected"));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        *self.removes.lock().entry(key.to_string()).or_default() += 1;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage(key, "remove rejected"));
        }
        self.inner.remove(key).await
    }
}
