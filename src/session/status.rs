//! Read-only session status.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::time::Instant;

// ============================================================================
// SessionStatus
// ============================================================================

/// What the session is doing right now.
///
/// Queried with [`Session::status`](crate::session::Session::status) or
/// watched with [`Session::status_watch`](crate::session::Session::status_watch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not started, or stopped explicitly. No reconnection occurs.
    Stopped,

    /// A connect attempt is in flight.
    Connecting,

    /// A connection is live and under heartbeat supervision.
    Connected,

    /// Waiting out a backoff delay before the next connect attempt.
    Reconnecting {
        /// Session-level attempt number, starting at 0.
        attempt: u32,
        /// When the next attempt fires.
        next_retry_at: Instant,
    },
}

impl SessionStatus {
    /// Returns `true` if a connection is currently live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if the session is stopped.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt, .. } => write!(f, "reconnecting(attempt={attempt})"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
