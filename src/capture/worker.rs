//! Screenshot acquisition for a single tab.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::cache::BoundedCache;
use crate::error::{Error, Result};
use crate::host::TabHost;
use crate::identifiers::TabId;

use super::ImageFormat;

// ============================================================================
// CaptureTicket
// ============================================================================

/// A dequeued capture request.
///
/// The queue keeps a clone of the in-flight ticket so that closing the tab
/// mid-capture can revoke it; a revoked ticket's result is discarded.
#[derive(Debug, Clone)]
pub struct CaptureTicket {
    tab_id: TabId,
    revoked: Arc<AtomicBool>,
}

impl CaptureTicket {
    /// Creates a live ticket.
    #[must_use]
    pub fn new(tab_id: TabId) -> Self {
        Self {
            tab_id,
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Tab to capture.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Returns `true` once the tab was torn down after dequeue.
    #[inline]
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    pub(crate) fn revoke(&self) {
        self.revoked.store(true, Ordering::Release);
    }
}

// ============================================================================
// CaptureOutcome
// ============================================================================

/// Why a capture was abandoned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The tab no longer exists.
    TabGone,
    /// The tab is not the active tab of its window.
    Inactive,
    /// The tab was closed while the capture was in flight.
    Revoked,
}

/// Non-error result of a capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Screenshot stored in the cache.
    Stored {
        /// Entry evicted to make room.
        evicted: Option<TabId>,
    },
    /// Preconditions were not met.
    Skipped(SkipReason),
}

// ============================================================================
// Capturer
// ============================================================================

/// The expensive operation serialized by the rate-limited queue.
#[async_trait]
pub trait Capturer: Send + Sync {
    /// Performs one capture attempt.
    async fn capture(&self, ticket: &CaptureTicket) -> Result<CaptureOutcome>;
}

// ============================================================================
// CaptureWorker
// ============================================================================

/// Captures the visible contents of active tabs into the screenshot cache.
pub struct CaptureWorker {
    host: Arc<dyn TabHost>,
    cache: Arc<BoundedCache>,
    format: ImageFormat,
}

impl CaptureWorker {
    /// Creates a worker writing into `cache`.
    pub fn new(host: Arc<dyn TabHost>, cache: Arc<BoundedCache>, format: ImageFormat) -> Self {
        Self {
            host,
            cache,
            format,
        }
    }

    /// Returns the requested image format.
    #[inline]
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

#[async_trait]
impl Capturer for CaptureWorker {
    async fn capture(&self, ticket: &CaptureTicket) -> Result<CaptureOutcome> {
        let tab_id = ticket.tab_id();

        let Some(tab) = self.host.get_tab(tab_id).await? else {
            return Ok(CaptureOutcome::Skipped(SkipReason::TabGone));
        };
        if !tab.active {
            return Ok(CaptureOutcome::Skipped(SkipReason::Inactive));
        }

        let data_url = self
            .host
            .capture_visible_tab(tab.window_id, self.format)
            .await
            .map_err(|e| match e {
                Error::Host { message } => Error::capture_denied(tab_id, message),
                other => other,
            })?;

        self.format.validate_data_url(&data_url)?;

        // The tab may have closed while the host was capturing.
        if ticket.is_revoked() {
            return Ok(CaptureOutcome::Skipped(SkipReason::Revoked));
        }

        let evicted = self.cache.put(tab_id, data_url);
        debug!(tab_id = %tab_id, ?evicted, "Screenshot cached");

        Ok(CaptureOutcome::Stored { evicted })
    }
}

// ============================================================================
// Tests
// ============================================================================
