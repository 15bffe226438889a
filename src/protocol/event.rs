//! Host event messages.
//!
//! The browser side forwards its listener callbacks as events:
//!
//! ```json
//! {
//!   "type": "event",
//!   "method": "tabs.onRemoved",
//!   "params": { "tabId": 12 }
//! }
//! ```
//!
//! # Event Methods
//!
//! | Method | Params |
//! |--------|--------|
//! | `tabs.onActivated` | `tabId`, `windowId` |
//! | `tabs.onUpdated` | `tabId`, `changeInfo`, `tab?` |
//! | `tabs.onCreated` | `tab` |
//! | `tabs.onRemoved` | `tabId` |
//! | `tabs.onReplaced` | `addedTabId`, `removedTabId` |
//! | `commands.onCommand` | `command` |
//! | `action.onClicked` | `tab?` |
//! | `storage.onChanged` | `areaName`, `changes` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::display::DisplayMode;
use crate::host::TabSnapshot;
use crate::identifiers::TabId;
use crate::lifecycle::{HostEvent, TabChange, TabEvent};
use crate::storage::DISPLAY_MODE_KEY;

// ============================================================================
// Event
// ============================================================================

/// An event notification from the browser side.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event type marker (always "event").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event name in `namespace.onEvent` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Returns the API namespace from the method.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a [`HostEvent`].
    ///
    /// Returns `None` for unknown methods, malformed params, and events the
    /// background process does not react to (for example storage changes in
    /// other areas).
    #[must_use]
    pub fn parse(&self) -> Option<HostEvent> {
        let event = match self.method.as_str() {
            "tabs.onActivated" => {
                let p: ActivatedParams = self.params_as()?;
                TabEvent::Activated { tab_id: p.tab_id }.into()
            }
            "tabs.onUpdated" => {
                let p: UpdatedParams = self.params_as()?;
                TabEvent::Updated {
                    tab_id: p.tab_id,
                    change: p.change_info,
                    tab: p.tab,
                }
                .into()
            }
            "tabs.onCreated" => {
                let p: CreatedParams = self.params_as()?;
                TabEvent::Created { tab: p.tab }.into()
            }
            "tabs.onRemoved" => {
                let p: RemovedParams = self.params_as()?;
                TabEvent::Removed { tab_id: p.tab_id }.into()
            }
            "tabs.onReplaced" => {
                let p: ReplacedParams = self.params_as()?;
                TabEvent::Replaced {
                    added: p.added_tab_id,
                    removed: p.removed_tab_id,
                }
                .into()
            }
            "commands.onCommand" => {
                let p: CommandParams = self.params_as()?;
                HostEvent::Command { name: p.command }
            }
            "action.onClicked" => {
                let p: ActionClickedParams = self.params_as()?;
                HostEvent::ActionClicked {
                    tab_id: p.tab.map(|t| t.id),
                }
            }
            "storage.onChanged" => {
                let p: StorageChangedParams = self.params_as()?;
                if p.area_name != "local" {
                    return None;
                }
                let change = p.changes.get(DISPLAY_MODE_KEY)?;
                HostEvent::DisplayModeChanged(DisplayMode::from_stored(change.get("newValue")))
            }
            _ => return None,
        };
        Some(event)
    }

    fn params_as<T: DeserializeOwned>(&self) -> Option<T> {
        match serde_json::from_value(self.params.clone()) {
            Ok(params) => Some(params),
            Err(e) => {
                debug!(method = %self.method, error = %e, "Malformed event params");
                None
            }
        }
    }
}

// ============================================================================
// Params
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivatedParams {
    tab_id: TabId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedParams {
    tab_id: TabId,
    #[serde(default)]
    change_info: TabChange,
    #[serde(default)]
    tab: Option<TabSnapshot>,
}

#[derive(Deserialize)]
struct CreatedParams {
    tab: TabSnapshot,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemovedParams {
    tab_id: TabId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplacedParams {
    added_tab_id: TabId,
    removed_tab_id: TabId,
}

#[derive(Deserialize)]
struct CommandParams {
    command: String,
}

#[derive(Deserialize)]
struct ActionClickedParams {
    #[serde(default)]
    tab: Option<TabRef>,
}

#[derive(Deserialize)]
struct TabRef {
    id: TabId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageChangedParams {
    area_name: String,
    #[serde(default)]
    changes: serde_json::Map<String, Value>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::identifiers::WindowId;
    use crate::lifecycle::LoadStatus;

    fn event(method: &str, params: Value) -> Event {
        serde_json::from_value(json!({ "type": "event", "method": method, "params": params }))
            .expect("parse event")
    }

    #[test]
    fn test_method_parts() {
        let e = event("tabs.onRemoved", json!({ "tabId": 1 }));
        assert_eq!(e.namespace(), "tabs");
        assert_eq!(e.event_name(), "onRemoved");
    }

    #[test]
    fn test_updated_parsing() {
        let e = event(
            "tabs.onUpdated",
            json!({
                "tabId": 4,
                "changeInfo": { "status": "complete" },
                "tab": { "id": 4, "windowId": 1, "active": true, "title": "Done" }
            }),
        );

        match e.parse() {
            Some(HostEvent::Tab(TabEvent::Updated { tab_id, change, tab })) => {
                assert_eq!(tab_id, TabId::new(4));
                assert_eq!(change.status, Some(LoadStatus::Complete));
                let tab = tab.expect("tab");
                assert_eq!(tab.window_id, WindowId::new(1));
                assert!(tab.active);
            }
            other => panic!("unexpected parse result: {other:?}"),
        }
    }

    #[test]
    fn test_updated_keeps_title_with_other_statuses() {
        for status in ["unloaded", "prerendering"] {
            let e = event(
                "tabs.onUpdated",
                json!({
                    "tabId": 4,
                    "changeInfo": { "status": status, "title": "Inbox (3)" },
                    "tab": { "id": 4, "windowId": 1, "active": false }
                }),
            );

            match e.parse() {
                Some(HostEvent::Tab(TabEvent::Updated { change, .. })) => {
                    assert_eq!(change.title.as_deref(), Some("Inbox (3)"));
                    assert_ne!(change.status, Some(LoadStatus::Complete));
                }
                other => panic!("unexpected parse result for {status}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_unloaded_status_is_recognized() {
        let change: TabChange =
            serde_json::from_value(json!({ "status": "unloaded" })).expect("parse");
        assert_eq!(change.status, Some(LoadStatus::Unloaded));

        let change: TabChange =
            serde_json::from_value(json!({ "status": "frozen" })).expect("parse");
        assert_eq!(change.status, Some(LoadStatus::Unknown));
    }

    #[test]
    fn test_replaced_parsing() {
        let e = event("tabs.onReplaced", json!({ "addedTabId": 9, "removedTabId": 8 }));
        assert_eq!(
            e.parse(),
            Some(HostEvent::Tab(TabEvent::Replaced {
                added: TabId::new(9),
                removed: TabId::new(8),
            }))
        );
    }

    #[test]
    fn test_action_clicked_without_tab() {
        let e = event("action.onClicked", json!({}));
        assert_eq!(e.parse(), Some(HostEvent::ActionClicked { tab_id: None }));
    }

    #[test]
    fn test_storage_change_for_display_mode() {
        let e = event(
            "storage.onChanged",
            json!({
                "areaName": "local",
                "changes": { "displayMode": { "oldValue": "popup", "newValue": "overlay" } }
            }),
        );
        assert_eq!(e.parse(), Some(HostEvent::DisplayModeChanged(DisplayMode::Overlay)));
    }

    #[test]
    fn test_storage_change_elsewhere_is_ignored() {
        let sync_area = event(
            "storage.onChanged",
            json!({ "areaName": "sync", "changes": { "displayMode": { "newValue": "overlay" } } }),
        );
        assert_eq!(sync_area.parse(), None);

        let other_key = event(
            "storage.onChanged",
            json!({ "areaName": "local", "changes": { "theme": { "newValue": "dark" } } }),
        );
        assert_eq!(other_key.parse(), None);
    }

    #[test]
    fn test_unknown_and_malformed_events() {
        assert_eq!(event("windows.onFocusChanged", json!({})).parse(), None);
        assert_eq!(event("tabs.onRemoved", json!({ "tabId": "x" })).parse(), None);
    }
}
