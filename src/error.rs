//! Error types for the tab preview cache.
//!
//! Most failures in this crate are absorbed close to where they happen:
//! capture failures are expected at high volume and persistence is
//! best-effort. The [`Error`] type still carries them so that the absorbing
//! site can decide what to log.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Host | [`Error::Host`], [`Error::TabNotFound`], [`Error::CaptureDenied`], [`Error::InvalidImage`] |
//! | Persistence | [`Error::Storage`] |
//! | Protocol | [`Error::UnknownAction`], [`Error::Protocol`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::TabId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by the builder when settings are invalid or a required
    /// collaborator is missing.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Host Errors
    // ========================================================================
    /// The host rejected or failed a call.
    #[error("Host error: {message}")]
    Host {
        /// Description of the host failure.
        message: String,
    },

    /// Tab no longer exists.
    #[error("Tab not found: {tab_id}")]
    TabNotFound {
        /// The missing tab ID.
        tab_id: TabId,
    },

    /// The host refused to capture the tab (quota, permissions, navigation).
    #[error("Capture denied for tab {tab_id}: {message}")]
    CaptureDenied {
        /// Tab whose capture was refused.
        tab_id: TabId,
        /// Host-provided reason.
        message: String,
    },

    /// The host returned image data that is not a usable data URL.
    #[error("Invalid image data: {message}")]
    InvalidImage {
        /// What was wrong with the data.
        message: String,
    },

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// Durable store read or write failed.
    #[error("Storage error on '{key}': {message}")]
    Storage {
        /// Storage key involved.
        key: String,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Request named an action the router does not serve.
    #[error("Unknown action: {action}")]
    UnknownAction {
        /// The unrecognized action.
        action: String,
    },

    /// Malformed message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection or background task went away.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a host error.
    #[inline]
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Creates a tab not found error.
    #[inline]
    pub fn tab_not_found(tab_id: TabId) -> Self {
        Self::TabNotFound { tab_id }
    }

    /// Creates a capture denied error.
    #[inline]
    pub fn capture_denied(tab_id: TabId, message: impl Into<String>) -> Self {
        Self::CaptureDenied {
            tab_id,
            message: message.into(),
        }
    }

    /// Creates an invalid image error.
    #[inline]
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown action error.
    #[inline]
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this failure is routine for a capture attempt.
    ///
    /// Tabs close and navigate mid-capture all the time, and the host
    /// enforces a capture quota. These never warrant more than trace logging.
    #[inline]
    #[must_use]
    pub fn is_expected_capture_failure(&self) -> bool {
        matches!(
            self,
            Self::Host { .. }
                | Self::TabNotFound { .. }
                | Self::CaptureDenied { .. }
                | Self::InvalidImage { .. }
        )
    }

    /// Returns `true` if this is a persistence error.
    #[inline]
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Io(_))
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::storage("screenshot_4", "disk full");
        assert_eq!(err.to_string(), "Storage error on 'screenshot_4': disk full");
    }

    #[test]
    fn test_capture_denied_display() {
        let err = Error::capture_denied(TabId::new(9), "quota exceeded");
        assert_eq!(
            err.to_string(),
            "Capture denied for tab 9: quota exceeded"
        );
    }

    #[test]
    fn test_is_expected_capture_failure() {
        assert!(Error::tab_not_found(TabId::new(1)).is_expected_capture_failure());
        assert!(Error::capture_denied(TabId::new(1), "x").is_expected_capture_failure());
        assert!(Error::invalid_image("x").is_expected_capture_failure());
        assert!(!Error::config("x").is_expected_capture_failure());
    }

    #[test]
    fn test_is_storage_error() {
        let io_err: Error = IoError::new(ErrorKind::PermissionDenied, "denied").into();
        assert!(io_err.is_storage_error());
        assert!(Error::storage("k", "m").is_storage_error());
        assert!(!Error::protocol("m").is_storage_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("refused").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::host("x").is_connection_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
