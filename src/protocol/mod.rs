//! Message types exchanged with the browser side.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | UI → Background | Cache read or UI action |
//! | `Response` | Background → UI | Result of a request |
//! | `Event` | Host → Background | Tab lifecycle and browser notifications |
//!
//! A text frame whose `type` is `"event"` is an [`Event`]; anything else is
//! treated as a request.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Host event messages |
//! | `request` | Router requests and responses |

// ============================================================================
// Submodules
// ============================================================================

/// Host event messages.
pub mod event;

/// Router request and response messages.
pub mod request;

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::Event;
pub use request::{Envelope, Request, Response, TabMetadata, requested_tab_ids};

// ============================================================================
// Incoming
// ============================================================================

/// A decoded inbound text frame.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Host event.
    Event(Event),
    /// Router request, possibly malformed. Parse failures are kept so the
    /// reply can carry the error and the caller's correlation ID.
    Request {
        /// Correlation ID, if one could be read.
        id: Option<Value>,
        /// Raw request object.
        body: Value,
    },
}

impl Incoming {
    /// Classifies a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the frame is not JSON, or if it is
    /// marked as an event but does not have the event shape.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        if value.get("type").and_then(Value::as_str) == Some("event") {
            return Ok(Self::Event(serde_json::from_value(value)?));
        }

        let id = value.get("id").cloned();
        Ok(Self::Request { id, body: value })
    }
}

// ============================================================================
// Tests
// ============================================================================
