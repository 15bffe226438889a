//! Display mode preference and the overlay launcher.
//!
//! The tab manager UI can be shown as the toolbar popup or as an overlay
//! injected into the active page. The choice is persisted under
//! `displayMode` and decides what the keyboard command and toolbar click do.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::host::TabHost;
use crate::identifiers::TabId;
use crate::storage::{DISPLAY_MODE_KEY, Mirror};

// ============================================================================
// Constants
// ============================================================================

/// Error code returned when there is no tab to inject the overlay into.
pub const NO_ACTIVE_TAB: &str = "NO_ACTIVE_TAB";

// ============================================================================
// DisplayMode
// ============================================================================

/// How the tab manager UI is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Toolbar popup page.
    #[default]
    Popup,
    /// Overlay injected into the active page.
    Overlay,
}

impl DisplayMode {
    /// Interprets a stored preference. Anything other than `"overlay"` is
    /// [`DisplayMode::Popup`].
    #[must_use]
    pub fn from_stored(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("overlay") => Self::Overlay,
            _ => Self::Popup,
        }
    }

    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Popup => "popup",
            Self::Overlay => "overlay",
        }
    }
}

// ============================================================================
// OverlayResult
// ============================================================================

/// Outcome of an overlay request, returned across the message boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayResult {
    /// Whether the overlay was injected.
    pub success: bool,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OverlayResult {
    /// Successful result.
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Failed result with a reason.
    #[inline]
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// DisplayController
// ============================================================================

/// Holds the current display mode and performs the UI-presentation actions.
pub struct DisplayController {
    host: Arc<dyn TabHost>,
    mode: RwLock<DisplayMode>,
}

impl DisplayController {
    /// Creates a controller in [`DisplayMode::Popup`].
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            host,
            mode: RwLock::new(DisplayMode::Popup),
        }
    }

    /// Returns the current mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> DisplayMode {
        *self.mode.read()
    }

    /// Loads the persisted preference and applies it to the host.
    ///
    /// A read failure falls back to [`DisplayMode::Popup`].
    pub async fn load(&self, mirror: &Mirror) {
        let stored = mirror.read(DISPLAY_MODE_KEY).await;
        self.apply(DisplayMode::from_stored(stored.as_ref())).await;
    }

    /// Switches mode and updates the host's action presentation.
    pub async fn apply(&self, mode: DisplayMode) {
        self.set_mode(mode);
        self.present(mode).await;
    }

    /// Switches mode without touching the host.
    pub fn set_mode(&self, mode: DisplayMode) {
        *self.mode.write() = mode;
        debug!(mode = mode.as_str(), "Display mode applied");
    }

    /// Updates the host's action presentation for `mode`.
    pub async fn present(&self, mode: DisplayMode) {
        if let Err(e) = self.host.set_action_presentation(mode).await {
            debug!(error = %e, "Failed to update action presentation");
        }
    }

    /// Injects the overlay into `target`, or into the active tab of the
    /// current window when no target is given.
    pub async fn open_overlay(&self, target: Option<TabId>) -> OverlayResult {
        let tab_id = match target {
            Some(tab_id) => Some(tab_id),
            None => match self.host.active_tab().await {
                Ok(tab) => tab.map(|t| t.id),
                Err(e) => {
                    warn!(error = %e, "Overlay injection failed");
                    return OverlayResult::failed(e.to_string());
                }
            },
        };

        let Some(tab_id) = tab_id else {
            return OverlayResult::failed(NO_ACTIVE_TAB);
        };

        match self.host.inject_overlay(tab_id).await {
            Ok(()) => OverlayResult::ok(),
            Err(e) => {
                warn!(tab_id = %tab_id, error = %e, "Overlay injection failed");
                OverlayResult::failed(e.to_string())
            }
        }
    }

    /// Opens the tab manager for the "open tab manager" command. Overlay mode
    /// injects into the active tab; popup mode opens the toolbar popup.
    pub async fn launch_tab_manager(&self, mode: DisplayMode) {
        match mode {
            DisplayMode::Overlay => {
                self.open_overlay(None).await;
            }
            DisplayMode::Popup => {
                if let Err(e) = self.host.open_popup().await {
                    debug!(error = %e, "Failed to open popup");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
