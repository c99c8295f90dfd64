//! Control frame protocol.
//!
//! Defines the minimal wire schema for liveness probing. Control frames are
//! dedicated to PING/PONG and carry nothing beyond the tag and an optional
//! nonce; application payloads never pass through this crate.
//!
//! # Wire Shape
//!
//! ```json
//! { "type": "ping", "nonce": "4b6c6f9e-..." }
//! { "type": "pong", "nonce": "4b6c6f9e-..." }
//! ```
//!
//! The `nonce` is optional in both directions; see [`ControlFrame`].

// ============================================================================
// Submodules
// ============================================================================

/// PING/PONG frame definition and serialization.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::ControlFrame;
