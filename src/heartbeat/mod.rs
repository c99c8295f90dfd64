//! Heartbeat state machine.
//!
//! One [`HeartbeatMonitor`] runs per live connection, owning the transport
//! and the [`Connection`] record for its whole lifetime. It probes the peer
//! on a fixed interval, answers the peer's probes, and declares the link
//! dead when replies stop arriving.
//!
//! # States
//!
//! ```text
//!              ping timer fires / send PING
//!    ┌───────────┐ ─────────────────────────► ┌──────────────┐
//!    │ Connected │                            │ AwaitingPong │
//!    └───────────┘ ◄───────────────────────── └──────────────┘
//!          ▲          matching PONG received       │
//!          │                                       │ deadline misses
//!          │                                       │ exhaust tolerance
//!          │                                       ▼
//!          │                                  ┌──────┐
//!          └───── (new connection only) ───── │ Dead │  terminal
//!                                             └──────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Per-connection record and [`LinkState`] |
//! | `monitor` | The select-loop driving timers and frames |

// ============================================================================
// Submodules
// ============================================================================

/// Per-connection record and link state.
pub mod connection;

/// The heartbeat monitor task.
pub mod monitor;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, LinkState};
pub(crate) use monitor::{HeartbeatMonitor, MonitorExit};
