//! Screenshot capture pipeline.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `format` | Image format and data URL validation |
//! | `queue` | Rate-limited single-consumer capture queue |
//! | `worker` | Precondition checks and the capture itself |

// ============================================================================
// Submodules
// ============================================================================

mod format;
mod queue;
mod worker;

// ============================================================================
// Re-exports
// ============================================================================

pub use format::{DEFAULT_JPEG_QUALITY, ImageFormat};
pub use queue::{DEFAULT_CAPTURE_DELAY, DrainState, RateLimitedQueue, RateState};
pub use worker::{CaptureOutcome, CaptureTicket, CaptureWorker, Capturer, SkipReason};
