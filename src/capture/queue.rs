//! Rate-limited capture queue.
//!
//! The capture API is quota-limited by the host, so captures are serialized
//! through a single drain loop with a minimum delay between attempts.
//!
//! # State Machine
//!
//! ```text
//!            enqueue (first item)
//!   ┌──────┐ ───────────────────► ┌──────────┐
//!   │ Idle │                      │ Draining │ ◄─┐ enqueue: append only
//!   └──────┘ ◄─────────────────── └──────────┘ ──┘
//!            queue empty at loop-top
//! ```
//!
//! Each turn of the drain loop waits until `min_delay` has passed since the
//! previous attempt finished, pops the front item and runs the capture. The
//! clock advances after every attempt, including skips and failures, so a
//! failing tab cannot be retried faster than the delay.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::cache::BoundedCache;
use crate::identifiers::TabId;

use super::worker::{CaptureTicket, Capturer};

// ============================================================================
// Constants
// ============================================================================

/// Minimum delay between two capture attempts.
pub const DEFAULT_CAPTURE_DELAY: Duration = Duration::from_millis(2000);

// ============================================================================
// Types
// ============================================================================

/// Drain loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// No drain loop is running.
    Idle,
    /// A drain loop owns the queue.
    Draining,
}

/// Process-wide capture timing.
#[derive(Debug, Default)]
pub struct RateState {
    /// When the previous attempt finished.
    pub last_capture_at: Option<Instant>,
    /// Capture currently running.
    in_flight: Option<CaptureTicket>,
}

impl RateState {
    /// Time still to wait before the next attempt may start.
    fn remaining_delay(&self, now: Instant, min_delay: Duration) -> Option<Duration> {
        let last = self.last_capture_at?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < min_delay).then(|| min_delay - elapsed)
    }
}

struct QueueState {
    pending: VecDeque<TabId>,
    drain: DrainState,
    rate: RateState,
}

struct QueueInner {
    state: Mutex<QueueState>,
    capturer: Arc<dyn Capturer>,
    cache: Arc<BoundedCache>,
    min_delay: Duration,
}

// ============================================================================
// RateLimitedQueue
// ============================================================================

/// Single-consumer FIFO of tabs awaiting capture.
///
/// Cheap to clone; clones share the same queue and drain loop.
#[derive(Clone)]
pub struct RateLimitedQueue {
    inner: Arc<QueueInner>,
}

impl RateLimitedQueue {
    /// Creates an idle queue.
    ///
    /// `cache` is consulted on enqueue so still-valid screenshots are not
    /// recaptured.
    pub fn new(capturer: Arc<dyn Capturer>, cache: Arc<BoundedCache>, min_delay: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    drain: DrainState::Idle,
                    rate: RateState::default(),
                }),
                capturer,
                cache,
                min_delay,
            }),
        }
    }

    /// Queues a tab for capture and starts draining if idle.
    ///
    /// Returns `false` if the tab is already queued or already cached. Must
    /// be called from within a tokio runtime.
    pub fn enqueue(&self, tab_id: TabId) -> bool {
        let start_drain = {
            let mut state = self.inner.state.lock();
            if state.pending.contains(&tab_id) || self.inner.cache.contains(tab_id) {
                return false;
            }

            state.pending.push_back(tab_id);
            match state.drain {
                DrainState::Idle => {
                    state.drain = DrainState::Draining;
                    true
                }
                DrainState::Draining => false,
            }
        };

        trace!(tab_id = %tab_id, start_drain, "Capture queued");

        if start_drain {
            tokio::spawn(Arc::clone(&self.inner).drain());
        }
        true
    }

    /// Strikes a torn-down tab.
    ///
    /// A queued request is dropped; an in-flight capture is revoked so its
    /// result is discarded. Returns `true` if either happened.
    pub fn remove(&self, tab_id: TabId) -> bool {
        let mut state = self.inner.state.lock();

        let before = state.pending.len();
        state.pending.retain(|id| *id != tab_id);
        let dequeued = state.pending.len() != before;

        let revoked = match &state.rate.in_flight {
            Some(ticket) if ticket.tab_id() == tab_id => {
                ticket.revoke();
                true
            }
            _ => false,
        };

        dequeued || revoked
    }

    /// Returns the number of queued tabs.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().pending.is_empty()
    }

    /// Returns `true` if `tab_id` is waiting in the queue.
    #[inline]
    #[must_use]
    pub fn contains(&self, tab_id: TabId) -> bool {
        self.inner.state.lock().pending.contains(&tab_id)
    }

    /// Returns the drain loop state.
    #[inline]
    #[must_use]
    pub fn drain_state(&self) -> DrainState {
        self.inner.state.lock().drain
    }

    /// Returns when the last capture attempt finished.
    #[inline]
    #[must_use]
    pub fn last_capture_at(&self) -> Option<Instant> {
        self.inner.state.lock().rate.last_capture_at
    }

    /// Returns the tab currently being captured.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> Option<TabId> {
        self.inner.state.lock().rate.in_flight.as_ref().map(CaptureTicket::tab_id)
    }
}

// ============================================================================
// Drain Loop
// ============================================================================

impl QueueInner {
    /// The one drain loop. Spawned on the Idle → Draining transition.
    async fn drain(self: Arc<Self>) {
        debug!("Capture drain started");

        loop {
            let wait = {
                let mut state = self.state.lock();
                if state.pending.is_empty() {
                    state.drain = DrainState::Idle;
                    break;
                }
                state.rate.remaining_delay(Instant::now(), self.min_delay)
            };

            if let Some(wait) = wait {
                sleep(wait).await;
            }

            // The queue may have been emptied by removals while waiting.
            let ticket = {
                let mut state = self.state.lock();
                let Some(tab_id) = state.pending.pop_front() else {
                    continue;
                };
                let ticket = CaptureTicket::new(tab_id);
                state.rate.in_flight = Some(ticket.clone());
                ticket
            };

            match self.capturer.capture(&ticket).await {
                Ok(outcome) => {
                    trace!(tab_id = %ticket.tab_id(), ?outcome, "Capture attempt finished");
                }
                Err(e) if e.is_expected_capture_failure() => {
                    trace!(tab_id = %ticket.tab_id(), error = %e, "Capture failed");
                }
                Err(e) => {
                    debug!(tab_id = %ticket.tab_id(), error = %e, "Capture failed unexpectedly");
                }
            }

            let mut state = self.state.lock();
            state.rate.in_flight = None;
            state.rate.last_capture_at = Some(Instant::now());
        }

        debug!("Capture drain idle");
    }
}

// ============================================================================
// Tests
// ============================================================================
