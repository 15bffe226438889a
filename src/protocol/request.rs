//! Router request and response messages.
//!
//! # Format
//!
//! ```json
//! { "id": 7, "action": "getScreenshot", "tabId": 12 }
//! { "id": 7, "screenshot": "data:image/jpeg;base64,..." }
//! ```
//!
//! `id` is optional and echoed back verbatim so a UI surface can correlate
//! replies on a shared socket.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::display::OverlayResult;
use crate::error::{Error, Result};
use crate::identifiers::TabId;

// ============================================================================
// Constants
// ============================================================================

/// Actions the router serves.
pub const ACTIONS: &[&str] = &["getScreenshot", "getCachedMetadata", "openOverlay"];

// ============================================================================
// Request
// ============================================================================

/// A request from a UI surface.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Screenshot for one tab.
    GetScreenshot {
        /// Tab to look up.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// Cached titles for a batch of tabs.
    GetCachedMetadata {
        /// Requested tabs. Kept loose: entries that are not integer IDs are
        /// ignored rather than failing the whole request.
        #[serde(rename = "tabIds", default)]
        tab_ids: Value,
    },

    /// Show the overlay UI.
    OpenOverlay {
        /// Target tab; defaults to the active tab of the current window.
        #[serde(rename = "tabId", default)]
        tab_id: Option<TabId>,
    },
}

impl Request {
    /// Returns the action name.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetScreenshot { .. } => "getScreenshot",
            Self::GetCachedMetadata { .. } => "getCachedMetadata",
            Self::OpenOverlay { .. } => "openOverlay",
        }
    }
}

/// Extracts the usable tab IDs from a loose `tabIds` value.
///
/// A non-array yields no IDs.
#[must_use]
pub fn requested_tab_ids(value: &Value) -> Vec<TabId> {
    value
        .as_array()
        .map(|ids| ids.iter().filter_map(TabId::from_json).collect())
        .unwrap_or_default()
}

// ============================================================================
// Envelope
// ============================================================================

/// A request plus its optional correlation ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Caller-chosen correlation ID.
    pub id: Option<Value>,
    /// The request.
    pub request: Request,
}

impl Envelope {
    /// Parses a request object.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownAction`] if `action` is missing or not served
    /// - [`Error::Json`] if the fields do not match the action
    pub fn from_value(mut value: Value) -> Result<Self> {
        let object = value
            .as_object_mut()
            .ok_or_else(|| Error::protocol("request is not an object"))?;

        let id = object.remove("id");

        let action = object
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !ACTIONS.contains(&action) {
            return Err(Error::unknown_action(action));
        }

        let request = serde_json::from_value(value)?;
        Ok(Self { id, request })
    }
}

// ============================================================================
// Response
// ============================================================================

/// Metadata returned per tab by `getCachedMetadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabMetadata {
    /// Last known non-blank title.
    pub title: String,
}

/// A response to a UI surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// `{ "screenshot": string | null }`
    Screenshot {
        /// Data URL, or `null` on a miss in both tiers.
        screenshot: Option<String>,
    },

    /// `{ "metadata": { "<tabId>": { "title": ... } } }`
    Metadata {
        /// Only tabs with a cached title.
        metadata: BTreeMap<String, TabMetadata>,
    },

    /// `{ "success": bool, "error"?: string }`
    Overlay(OverlayResult),

    /// `{ "error": string }` for requests that could not be served.
    Error {
        /// Description of the failure.
        error: String,
    },
}

impl Response {
    /// Creates an error response.
    #[must_use]
    pub fn error(error: &Error) -> Self {
        Self::Error {
            error: error.to_string(),
        }
    }

    /// Serializes the response, attaching the correlation ID if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_value_with_id(&self, id: Option<Value>) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let (Some(id), Some(object)) = (id, value.as_object_mut()) {
            object.insert("id".to_string(), id);
        }
        Ok(value)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_get_screenshot_with_id() {
        let env = Envelope::from_value(json!({ "id": 3, "action": "getScreenshot", "tabId": 12 }))
            .expect("parse");

        assert_eq!(env.id, Some(json!(3)));
        assert_eq!(env.request, Request::GetScreenshot { tab_id: TabId::new(12) });
    }

    #[test]
    fn test_parse_open_overlay_without_fields() {
        let env = Envelope::from_value(json!({ "action": "openOverlay" })).expect("parse");
        assert_eq!(env.request, Request::OpenOverlay { tab_id: None });
        assert_eq!(env.request.action(), "openOverlay");
    }

    #[test]
    fn test_unknown_action() {
        let err = Envelope::from_value(json!({ "action": "closeAllTabs" })).unwrap_err();
        assert!(matches!(err, Error::UnknownAction { .. }));

        let err = Envelope::from_value(json!({ "tabId": 1 })).unwrap_err();
        assert!(matches!(err, Error::UnknownAction { .. }));
    }

    #[test]
    fn test_bad_fields_are_json_errors() {
        let err = Envelope::from_value(json!({ "action": "getScreenshot", "tabId": "x" }))
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_requested_tab_ids_filters_garbage() {
        let ids = requested_tab_ids(&json!([1, "2", 3.5, null, "x", 4]));
        assert_eq!(ids, vec![TabId::new(1), TabId::new(2), TabId::new(4)]);
        assert!(requested_tab_ids(&json!("1,2")).is_empty());
        assert!(requested_tab_ids(&Value::Null).is_empty());
    }

    #[test]
    fn test_screenshot_miss_serializes_null() {
        let value = Response::Screenshot { screenshot: None }
            .to_value_with_id(None)
            .expect("serialize");
        assert_eq!(value, json!({ "screenshot": null }));
    }

    #[test]
    fn test_metadata_response_shape_with_id() {
        let mut metadata = BTreeMap::new();
        metadata.insert("5".to_string(), TabMetadata { title: "Docs".into() });

        let value = Response::Metadata { metadata }
            .to_value_with_id(Some(json!("req-1")))
            .expect("serialize");
        assert_eq!(
            value,
            json!({ "id": "req-1", "metadata": { "5": { "title": "Docs" } } })
        );
    }
}
