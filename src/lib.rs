//! linkpulse - Connection liveness for long-lived message transports.
//!
//! This library sits on top of any full-duplex, message-oriented transport
//! and keeps the link honest: it detects silent failures with a PING/PONG
//! heartbeat, keeps intermediaries from reaping idle connections, and drives
//! reconnection with jittered exponential backoff.
//!
//! # Architecture
//!
//! One [`Session`] supervises one logical connection:
//!
//! - [`Session`] owns the current transport and exposes `start()`/`stop()`
//! - A heartbeat monitor probes the peer and declares the link dead when
//!   replies stop arriving
//! - The reconnect loop waits out a backoff delay and opens a fresh
//!   transport through the session's [`Connector`]
//!
//! Key design principles:
//!
//! - One task owns all connection state (no locks, no reentrancy)
//! - Incoming frames are pulled, not delivered via callbacks
//! - Timers are deadlines local to the monitor loop; an epoch counter makes
//!   wakeups that race a `stop()` harmless
//! - The embedding application observes everything through one hook and a
//!   status query, and is never blocked by the subsystem
//!
//! # Quick Start
//!
//! ```no_run
//! use linkpulse::{HeartbeatConfig, Session, SessionStatus, WsConnector};
//!
//! #[tokio::main]
//! async fn main() -> linkpulse::Result<()> {
//!     let connector = WsConnector::new("ws://127.0.0.1:9000/live")?;
//!
//!     let session = Session::builder(connector)
//!         .heartbeat(HeartbeatConfig::default())
//!         .hook(|event| tracing::debug!(?event, "liveness"))
//!         .build()?;
//!
//!     session.start();
//!
//!     // Wait until the first connect lands.
//!     let mut status = session.status_watch();
//!     while !status.borrow_and_update().is_connected() {
//!         status.changed().await.expect("session gone");
//!     }
//!
//!     // ... application traffic flows on its own connection ...
//!
//!     session.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Heartbeat timing and backoff policy |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`heartbeat`] | Per-connection state machine |
//! | [`hooks`] | Observability events and the hook boundary |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | PING/PONG control frame schema |
//! | [`reconnect`] | Backoff and retry state |
//! | [`session`] | Session supervisor: `start()`, `stop()`, status |
//! | [`transport`] | Transport port and the WebSocket implementation |
//!
//! # Guarantees
//!
//! - A dead link is detected within `pong_timeout * max_missed_beats` of the
//!   first unanswered probe
//! - A peer that keeps answering is never declared dead
//! - Reconnect delays are non-decreasing (pre-jitter) and capped
//! - `stop()` cancels every pending timer and reconnect wait; stale wakeups
//!   cannot touch a later session's state

// ============================================================================
// Modules
// ============================================================================

/// Heartbeat timing and backoff policy configuration.
///
/// Validated at build time; invalid values are rejected, never clamped.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Per-connection heartbeat state machine.
///
/// Internal machinery; the public pieces are [`LinkState`] and the
/// [`Connection`] record surfaced through hook events.
pub mod heartbeat;

/// Observability events and the hook boundary.
///
/// The only surface the subsystem exposes to logging/metrics collaborators.
pub mod hooks;

/// Type-safe identifiers for liveness entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// PING/PONG control frame schema.
pub mod protocol;

/// Reconnection with exponential backoff.
pub mod reconnect;

/// Session supervisor: `start()`, `stop()`, status queries.
pub mod session;

/// Transport port and the WebSocket implementation.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Session types
pub use session::{Session, SessionBuilder, SessionStatus};

// Configuration types
pub use config::{BackoffPolicy, HeartbeatConfig};

// Heartbeat types
pub use heartbeat::{Connection, LinkState};

// Hook types
pub use hooks::{DeadReason, LivenessEvent, LivenessHook};

// Protocol types
pub use protocol::ControlFrame;

// Transport types
pub use transport::{Connector, Transport, TransportEvent, WsConnector, WsTransport};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, Nonce};
