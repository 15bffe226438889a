//! Tab lifecycle tracking.
//!
//! Translates host events into cache, title index and queue operations.
//!
//! | Event | Effect |
//! |-------|--------|
//! | Activated | enqueue capture, refresh title |
//! | Updated | record title delta; on load complete of an active tab, enqueue |
//! | Created | seed a non-blank title |
//! | Removed | drop screenshot (memory + durable), title, queued capture |
//! | Replaced | move title to the new identity; screenshot is not moved |
//!
//! Events are handled one at a time in arrival order.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::cache::{BoundedCache, TitleIndex};
use crate::capture::RateLimitedQueue;
use crate::display::{DisplayController, DisplayMode};
use crate::host::{TabHost, TabSnapshot};
use crate::identifiers::TabId;

// ============================================================================
// Constants
// ============================================================================

/// Keyboard command that opens the tab manager.
pub const OPEN_TAB_MANAGER_COMMAND: &str = "open-tab-manager";

// ============================================================================
// Events
// ============================================================================

/// Page load status reported with tab updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Tab was discarded and holds no page.
    Unloaded,
    /// Navigation in progress.
    Loading,
    /// Page finished loading.
    Complete,
    /// Any status this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// Properties that changed in a tab update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabChange {
    /// New title, if the title changed.
    #[serde(default)]
    pub title: Option<String>,
    /// New load status, if it changed.
    #[serde(default)]
    pub status: Option<LoadStatus>,
}

impl TabChange {
    fn is_complete(&self) -> bool {
        self.status == Some(LoadStatus::Complete)
    }
}

/// Tab lifecycle signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    /// Tab gained focus in its window.
    Activated {
        /// Focused tab.
        tab_id: TabId,
    },
    /// Tab navigated or changed title.
    Updated {
        /// Updated tab.
        tab_id: TabId,
        /// What changed.
        change: TabChange,
        /// Tab state after the change, when the host supplies it.
        tab: Option<TabSnapshot>,
    },
    /// Tab was opened.
    Created {
        /// The new tab.
        tab: TabSnapshot,
    },
    /// Tab was closed.
    Removed {
        /// Closed tab.
        tab_id: TabId,
    },
    /// Host swapped one tab identity for another (prerender, discard).
    Replaced {
        /// New identity.
        added: TabId,
        /// Retired identity.
        removed: TabId,
    },
}

/// Any event the background process reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Tab lifecycle signal.
    Tab(TabEvent),
    /// Keyboard command.
    Command {
        /// Command name from the manifest.
        name: String,
    },
    /// Toolbar action clicked (only delivered without a popup).
    ActionClicked {
        /// Tab the action was clicked on.
        tab_id: Option<TabId>,
    },
    /// The persisted display mode changed.
    DisplayModeChanged(DisplayMode),
}

impl From<TabEvent> for HostEvent {
    #[inline]
    fn from(event: TabEvent) -> Self {
        Self::Tab(event)
    }
}

// ============================================================================
// TabLifecycleTracker
// ============================================================================

/// Applies host events to the shared caches and the capture queue.
pub struct TabLifecycleTracker {
    host: Arc<dyn TabHost>,
    cache: Arc<BoundedCache>,
    titles: Arc<TitleIndex>,
    queue: RateLimitedQueue,
    display: Arc<DisplayController>,
}

impl TabLifecycleTracker {
    /// Creates a tracker over the shared components.
    pub fn new(
        host: Arc<dyn TabHost>,
        cache: Arc<BoundedCache>,
        titles: Arc<TitleIndex>,
        queue: RateLimitedQueue,
        display: Arc<DisplayController>,
    ) -> Self {
        Self {
            host,
            cache,
            titles,
            queue,
            display,
        }
    }

    /// Consumes events until every sender is dropped.
    pub async fn run(self: Arc<Self>, mut events_rx: mpsc::UnboundedReceiver<HostEvent>) {
        debug!("Lifecycle tracker started");

        while let Some(event) = events_rx.recv().await {
            self.handle(event).await;
        }

        debug!("Lifecycle tracker terminated");
    }

    /// Handles one event.
    ///
    /// Cache, title and queue updates are applied before this returns. Host
    /// calls for UI presentation run on their own tasks, so a stalled host
    /// never holds up later tab events.
    pub async fn handle(&self, event: HostEvent) {
        match event {
            HostEvent::Tab(event) => self.handle_tab(event).await,
            HostEvent::Command { name } => {
                if name == OPEN_TAB_MANAGER_COMMAND {
                    let mode = self.display.mode();
                    let display = Arc::clone(&self.display);
                    tokio::spawn(async move { display.launch_tab_manager(mode).await });
                } else {
                    trace!(command = %name, "Ignoring command");
                }
            }
            // In popup mode the host opens the popup itself.
            HostEvent::ActionClicked { tab_id } => {
                if self.display.mode() == DisplayMode::Overlay {
                    let display = Arc::clone(&self.display);
                    tokio::spawn(async move { display.open_overlay(tab_id).await });
                }
            }
            HostEvent::DisplayModeChanged(mode) => {
                self.display.set_mode(mode);
                let display = Arc::clone(&self.display);
                tokio::spawn(async move { display.present(mode).await });
            }
        }
    }

    async fn handle_tab(&self, event: TabEvent) {
        trace!(?event, "Tab event");

        match event {
            TabEvent::Activated { tab_id } => {
                self.queue.enqueue(tab_id);

                let host = Arc::clone(&self.host);
                let titles = Arc::clone(&self.titles);
                tokio::spawn(async move {
                    match host.get_tab(tab_id).await {
                        Ok(Some(tab)) => {
                            if let Some(title) = tab.usable_title() {
                                titles.record_title(tab_id, title);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => trace!(tab_id = %tab_id, error = %e, "Tab lookup failed"),
                    }
                });
            }

            TabEvent::Updated { tab_id, change, tab } => {
                if let Some(title) = change.title.as_deref() {
                    self.titles.record_title(tab_id, title);
                } else if change.is_complete()
                    && let Some(title) = tab.as_ref().and_then(TabSnapshot::usable_title)
                {
                    self.titles.record_title(tab_id, title);
                }

                if change.is_complete() && tab.as_ref().is_some_and(|t| t.active) {
                    self.queue.enqueue(tab_id);
                }
            }

            TabEvent::Created { tab } => {
                if let Some(title) = tab.usable_title() {
                    self.titles.record_title(tab.id, title);
                }
            }

            TabEvent::Removed { tab_id } => {
                self.cache.delete(tab_id);
                self.titles.remove(tab_id);
                self.queue.remove(tab_id);
                debug!(tab_id = %tab_id, "Tab removed from caches");
            }

            TabEvent::Replaced { added, removed } => {
                self.titles.transfer(removed, added);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
