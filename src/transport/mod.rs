//! Transport port.
//!
//! The session runs on top of any full-duplex, message-oriented transport
//! that can carry an opaque control frame in each direction and report its
//! own closure. This module defines that seam and ships one implementation
//! over WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                          ┌─────────────────┐
//! │  Session (local) │        Connector         │  Remote peer    │
//! │                  │──────── connect ────────►│                 │
//! │  HeartbeatMonitor│◄──── Transport::recv ────│                 │
//! │                  │───── Transport::send ───►│                 │
//! └──────────────────┘                          └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. [`Connector::connect`] - Open a fresh transport (or fail)
//! 2. [`Transport::send`] / [`Transport::recv`] - Exchange control frames
//! 3. [`TransportEvent::Closed`] - The sole authoritative closure signal
//! 4. [`Transport::close`] - Best-effort graceful shutdown
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `port` | [`Transport`] and [`Connector`] trait contracts |
//! | `websocket` | WebSocket implementation over tokio-tungstenite |

// ============================================================================
// Submodules
// ============================================================================

/// Transport and connector trait contracts.
pub mod port;

/// WebSocket implementation of the transport port.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use port::{Connector, Transport, TransportEvent};
pub use websocket::{WsConnector, WsTransport};
