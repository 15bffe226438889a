//! Type-safe identifiers for host-owned browser entities.
//!
//! Tab and window identities are allocated by the browser. This crate never
//! mints them, it only reacts to their lifecycle. Newtypes keep a window ID
//! from being passed where a tab ID is expected.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// TabId
// ============================================================================

/// Browser tab identity.
///
/// Stable for the lifetime of a tab, reassigned on tab replacement and
/// invalidated on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab ID from the host's raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Parses a loosely typed JSON value into a tab ID.
    ///
    /// Accepts non-negative integers and strings holding one. Fractional or
    /// out-of-range numbers yield `None`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|raw| u32::try_from(raw).ok())
                .map(Self),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TabId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

impl From<u32> for TabId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ============================================================================
// WindowId
// ============================================================================

/// Browser window identity. Needed by the capture API, which captures the
/// visible tab of a window rather than a tab directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u32);

impl WindowId {
    /// Creates a window ID from the host's raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
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
    fn test_tab_id_display_and_parse() {
        let id = TabId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<TabId>().expect("parse"), id);
    }

    #[test]
    fn test_tab_id_from_json_accepts_integers_and_numeric_strings() {
        assert_eq!(TabId::from_json(&json!(7)), Some(TabId::new(7)));
        assert_eq!(TabId::from_json(&json!("8")), Some(TabId::new(8)));
    }

    #[test]
    fn test_tab_id_from_json_rejects_garbage() {
        assert_eq!(TabId::from_json(&json!(1.5)), None);
        assert_eq!(TabId::from_json(&json!(-3)), None);
        assert_eq!(TabId::from_json(&json!("abc")), None);
        assert_eq!(TabId::from_json(&json!(null)), None);
        assert_eq!(TabId::from_json(&json!(u64::MAX)), None);
    }

    #[test]
    fn test_tab_id_serializes_transparently() {
        let json = serde_json::to_string(&TabId::new(5)).expect("serialize");
        assert_eq!(json, "5");
    }
}
