//! WebSocket transport layer.
//!
//! Browser-side code reaches the background process over a local WebSocket.
//! The same socket carries host events in and request replies out.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Background     │                              │  Browser side   │
//! │  (Rust)         │         WebSocket            │                 │
//! │  RouterServer   │◄────────────────────────────►│  Host shim,     │
//! │  → Connection   │      localhost:PORT          │  popup, overlay │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Frames
//!
//! | Frame | Direction | Handling |
//! |-------|-----------|----------|
//! | `{"type":"event", ...}` | In | Parsed and queued for the lifecycle tracker |
//! | `{"action": ...}` | In | Dispatched to the request router |
//! | Reply object | Out | Carries the request `id` when one was sent |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Per-socket event loop |
//! | `server` | Listener and accept loop |

// ============================================================================
// Submodules
// ============================================================================

/// Per-socket event loop.
pub mod connection;

/// WebSocket listener and accept loop.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use server::RouterServer;
