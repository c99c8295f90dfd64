//! Reconnection with exponential backoff.
//!
//! When a connection dies or a connect attempt fails, the session waits a
//! [`BackoffPolicy`]-derived delay before trying again. The retry state is
//! held in an explicit [`RetryTimer`] value rather than recursive timers, so
//! the current attempt number and next retry time stay inspectable; they
//! surface through
//! [`SessionStatus::Reconnecting`](crate::session::SessionStatus).
//!
//! [`BackoffPolicy`]: crate::config::BackoffPolicy

// ============================================================================
// Submodules
// ============================================================================

/// Attempt counting and jittered delay derivation.
pub mod backoff;

// ============================================================================
// Re-exports
// ============================================================================

pub(crate) use backoff::RetryTimer;
