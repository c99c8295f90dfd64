//! Transport and connector trait contracts.
//!
//! These traits are the only thing the liveness machinery knows about the
//! outside world. Handshakes, TLS, framing of application messages and
//! authentication all live behind [`Connector::connect`].
//!
//! Incoming traffic is pulled, not pushed: the heartbeat monitor drains
//! [`Transport::recv`] from its own select loop, which serializes every
//! mutation of connection state without locks or reentrancy.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::ControlFrame;

// ============================================================================
// TransportEvent
// ============================================================================

/// One item pulled from a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// A decoded control frame.
    Frame(ControlFrame),

    /// An inbound message that could not be decoded as a control frame.
    ///
    /// The state machine ignores these; they exist so a noisy or
    /// partially-conforming peer cannot wedge the heartbeat cycle.
    Malformed,

    /// The transport is closed. Terminal: no further events follow.
    ///
    /// This is the sole authoritative closure signal; [`Transport::close`]
    /// is not assumed to take effect synchronously.
    Closed,
}

// ============================================================================
// Transport
// ============================================================================

/// A live full-duplex link carrying control frames.
///
/// The monitor task is the sole owner of a transport; implementations do not
/// need interior mutability or locking.
///
/// # Contract
///
/// - `recv` must be cancel-safe: a `recv` future dropped before completion
///   must not lose an inbound frame. Channel- and stream-backed transports
///   get this for free.
/// - After `recv` returns [`TransportEvent::Closed`] the transport is dead;
///   further calls may return `Closed` forever.
/// - Frames are delivered in FIFO order per connection. Nothing beyond that
///   is assumed.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Sends a control frame to the peer.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be handed to the link. A send
    /// failure is treated as death of the connection.
    async fn send(&mut self, frame: ControlFrame) -> Result<()>;

    /// Pulls the next inbound event. Must be cancel-safe.
    async fn recv(&mut self) -> TransportEvent;

    /// Closes the transport, best effort.
    ///
    /// Errors are swallowed: close races with remote closure by design, and
    /// a link being torn down has nothing useful to report.
    async fn close(&mut self);
}

// ============================================================================
// Connector
// ============================================================================

/// Opens fresh transports for a session.
///
/// Called once at start and again for every reconnect attempt. An
/// implementation may block for as long as its handshake needs; the session
/// drops the in-flight future if `stop()` arrives meanwhile.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport type produced by this connector.
    type Transport: Transport;

    /// Opens a new transport.
    ///
    /// # Errors
    ///
    /// Any error, immediate or after a long handshake, is treated as a
    /// transient failure and feeds the reconnect backoff loop.
    async fn connect(&self) -> Result<Self::Transport>;
}
