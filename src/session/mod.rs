//! Session supervision.
//!
//! The session is the top-level owner: it holds the current transport
//! through its heartbeat monitor, replaces it via the reconnect loop when it
//! dies, and exposes `start()`/`stop()` plus a status query to the
//! embedding application.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `status` | The read-only [`SessionStatus`] query type |
//! | `supervisor` | [`Session`], [`SessionBuilder`] and the session task |

// ============================================================================
// Submodules
// ============================================================================

/// Read-only session status.
pub mod status;

/// Session supervisor and its task.
pub mod supervisor;

// ============================================================================
// Re-exports
// ============================================================================

pub use status::SessionStatus;
pub use supervisor::{Session, SessionBuilder};

pub(crate) use supervisor::{EpochGuard, SessionCommand};
