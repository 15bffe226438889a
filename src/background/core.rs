//! The background process context.
//!
//! [`Background`] owns every process-wide singleton: the screenshot cache,
//! the title index, the capture queue, the display controller and the mirror.
//! Handlers receive them from here instead of reaching for globals.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{BoundedCache, TitleIndex};
use crate::capture::{CaptureWorker, RateLimitedQueue};
use crate::display::{DisplayController, DisplayMode};
use crate::error::{Error, Result};
use crate::host::TabHost;
use crate::lifecycle::{HostEvent, TabLifecycleTracker};
use crate::router::RequestRouter;
use crate::storage::{Mirror, Storage};

use super::builder::BackgroundBuilder;
use super::options::Settings;

// ============================================================================
// Background
// ============================================================================

/// A running background process.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Background {
    inner: Arc<BackgroundInner>,
}

struct BackgroundInner {
    settings: Settings,
    host: Arc<dyn TabHost>,
    mirror: Mirror,
    cache: Arc<BoundedCache>,
    titles: Arc<TitleIndex>,
    queue: RateLimitedQueue,
    display: Arc<DisplayController>,
    router: RequestRouter,
    events_tx: mpsc::UnboundedSender<HostEvent>,
    tracker_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background")
            .field("settings", &self.inner.settings)
            .field("cache", &self.inner.cache)
            .field("queued", &self.inner.queue.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Background - Lifecycle
// ============================================================================

impl Background {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BackgroundBuilder {
        BackgroundBuilder::new()
    }

    /// Wires the components together and runs initialization.
    ///
    /// Initialization order: display mode, title index (seed then reconcile
    /// against live tabs), event loop, startup capture of the active tab.
    pub(crate) async fn start(
        settings: Settings,
        host: Arc<dyn TabHost>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let mirror = Mirror::spawn(storage);
        let cache = Arc::new(BoundedCache::new(settings.capacity, mirror.clone()));
        let titles = Arc::new(TitleIndex::new(mirror.clone()));
        let worker = CaptureWorker::new(
            Arc::clone(&host),
            Arc::clone(&cache),
            settings.image_format,
        );
        let queue = RateLimitedQueue::new(
            Arc::new(worker),
            Arc::clone(&cache),
            settings.capture_delay,
        );
        let display = Arc::new(DisplayController::new(Arc::clone(&host)));
        let router = RequestRouter::new(
            Arc::clone(&cache),
            Arc::clone(&titles),
            mirror.clone(),
            Arc::clone(&display),
        );
        let tracker = Arc::new(TabLifecycleTracker::new(
            Arc::clone(&host),
            Arc::clone(&cache),
            Arc::clone(&titles),
            queue.clone(),
            Arc::clone(&display),
        ));

        display.load(&mirror).await;
        Self::initialize_titles(&titles, host.as_ref()).await;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let tracker_task = tokio::spawn(tracker.run(events_rx));

        let background = Self {
            inner: Arc::new(BackgroundInner {
                settings,
                host,
                mirror,
                cache,
                titles,
                queue,
                display,
                router,
                events_tx,
                tracker_task: Mutex::new(Some(tracker_task)),
            }),
        };

        if settings.capture_on_start {
            background.capture_active_tab().await;
        }

        info!(
            capacity = settings.capacity,
            delay = ?settings.capture_delay,
            mode = background.display_mode().as_str(),
            "Background started"
        );

        Ok(background)
    }

    /// Seeds the title index from storage, then repairs it against the live
    /// tabs. Either step may fail without affecting the other.
    async fn initialize_titles(titles: &TitleIndex, host: &dyn TabHost) {
        let loaded = titles.load().await;

        match host.query_tabs().await {
            Ok(tabs) => {
                let updated = titles.reconcile(&tabs);
                debug!(loaded, updated, "Title index initialized");
            }
            Err(e) => debug!(loaded, error = %e, "Initial tab query failed"),
        }
    }

    /// Enqueues only the active tab of the current window to stay within the
    /// capture quota.
    async fn capture_active_tab(&self) {
        match self.inner.host.active_tab().await {
            Ok(Some(tab)) => {
                self.inner.queue.enqueue(tab.id);
            }
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Active tab query failed"),
        }
    }

    /// Stops the event loop and waits for pending durable writes.
    ///
    /// Events sent after shutdown are rejected. A capture already running
    /// is allowed to finish.
    pub async fn shutdown(&self) {
        info!("Background shutting down");

        let task = self.inner.tracker_task.lock().take();
        if let Some(task) = task {
            task.abort();
        }

        self.inner.mirror.flush().await;

        info!("Background shutdown complete");
    }
}

// ============================================================================
// Background - Public API
// ============================================================================

impl Background {
    /// Delivers a host event to the lifecycle tracker.
    ///
    /// Events are processed in send order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] after shutdown.
    pub fn send_event(&self, event: impl Into<HostEvent>) -> Result<()> {
        self.inner
            .events_tx
            .send(event.into())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns a sender for host events, for transports that outlive a
    /// borrow of `self`.
    #[must_use]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<HostEvent> {
        self.inner.events_tx.clone()
    }

    /// Returns the request router.
    #[inline]
    #[must_use]
    pub fn router(&self) -> RequestRouter {
        self.inner.router.clone()
    }

    /// Returns the settings in effect.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.inner.settings
    }

    /// Returns the screenshot cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<BoundedCache> {
        &self.inner.cache
    }

    /// Returns the title index.
    #[inline]
    #[must_use]
    pub fn titles(&self) -> &Arc<TitleIndex> {
        &self.inner.titles
    }

    /// Returns the capture queue.
    #[inline]
    #[must_use]
    pub fn queue(&self) -> &RateLimitedQueue {
        &self.inner.queue
    }

    /// Returns the current display mode.
    #[inline]
    #[must_use]
    pub fn display_mode(&self) -> DisplayMode {
        self.inner.display.mode()
    }

    /// Waits until every durable write scheduled so far has been applied.
    pub async fn flush(&self) {
        self.inner.mirror.flush().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
