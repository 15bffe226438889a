//! Browser host collaborator.
//!
//! Everything the background process needs from the browser goes through
//! [`TabHost`]: tab queries, the capture API, overlay injection and the
//! toolbar action. The browser side owns tab identities; this crate only
//! reads them.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capture::ImageFormat;
use crate::display::DisplayMode;
use crate::error::Result;
use crate::identifiers::{TabId, WindowId};

// ============================================================================
// TabSnapshot
// ============================================================================

/// Point-in-time view of a live tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    /// Tab identity.
    pub id: TabId,
    /// Owning window.
    pub window_id: WindowId,
    /// Whether this is the active tab of its window.
    #[serde(default)]
    pub active: bool,
    /// Display title, possibly blank while loading.
    #[serde(default)]
    pub title: Option<String>,
    /// Current URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Pinned state.
    #[serde(default)]
    pub pinned: bool,
}

impl TabSnapshot {
    /// Creates a snapshot with no title or URL.
    #[must_use]
    pub fn new(id: TabId, window_id: WindowId, active: bool) -> Self {
        Self {
            id,
            window_id,
            active,
            title: None,
            url: None,
            pinned: false,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Returns the trimmed title if it is non-blank.
    #[must_use]
    pub fn usable_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

// ============================================================================
// TabHost
// ============================================================================

/// Browser APIs consumed by the background process.
///
/// Every method is a suspension point: other lifecycle events may mutate
/// shared state while a call is outstanding.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Looks up a tab. A tab that no longer exists is `Ok(None)`.
    async fn get_tab(&self, tab_id: TabId) -> Result<Option<TabSnapshot>>;

    /// Lists every open tab in every window.
    async fn query_tabs(&self) -> Result<Vec<TabSnapshot>>;

    /// Returns the active tab of the current window, if any.
    async fn active_tab(&self) -> Result<Option<TabSnapshot>>;

    /// Captures the visible tab of a window, returning a data URL.
    ///
    /// No timeout is applied by callers.
    async fn capture_visible_tab(&self, window_id: WindowId, format: ImageFormat)
        -> Result<String>;

    /// Injects the overlay UI into a tab.
    async fn inject_overlay(&self, tab_id: TabId) -> Result<()>;

    /// Opens the toolbar popup.
    async fn open_popup(&self) -> Result<()>;

    /// Configures what clicking the toolbar action does.
    ///
    /// In [`DisplayMode::Popup`] the action opens the popup page; in
    /// [`DisplayMode::Overlay`] it emits an action-clicked event instead.
    async fn set_action_presentation(&self, mode: DisplayMode) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_title_trims_and_rejects_blank() {
        let tab = TabSnapshot::new(TabId::new(1), WindowId::new(1), true);
        assert_eq!(tab.usable_title(), None);

        let tab = tab.with_title("   ");
        assert_eq!(tab.usable_title(), None);

        let tab = tab.with_title("  Docs \n");
        assert_eq!(tab.usable_title(), Some("Docs"));
    }

    #[test]
    fn test_snapshot_deserializes_host_shape() {
        let json = r#"{
            "id": 4,
            "windowId": 2,
            "active": true,
            "title": "Inbox",
            "url": "https://mail.example.com",
            "pinned": true,
            "index": 0
        }"#;

        let tab: TabSnapshot = serde_json::from_str(json).expect("parse");
        assert_eq!(tab.id, TabId::new(4));
        assert_eq!(tab.window_id, WindowId::new(2));
        assert!(tab.active && tab.pinned);
        assert_eq!(tab.usable_title(), Some("Inbox"));

        let built = TabSnapshot::new(TabId::new(4), WindowId::new(2), true)
            .with_title("Inbox")
            .with_url("https://mail.example.com");
        assert_eq!(tab.url, built.url);
        assert_eq!(tab.title, built.title);
    }
}
