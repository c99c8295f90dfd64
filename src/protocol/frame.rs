//! PING/PONG control frames.
//!
//! # Format
//!
//! ```json
//! { "type": "ping", "nonce": "4b6c6f9e-..." }
//! ```
//!
//! The nonce is optional. A peer that omits it still participates in the
//! heartbeat cycle: a nonce-less PONG acknowledges whatever probe is
//! outstanding.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::Nonce;

// ============================================================================
// ControlFrame
// ============================================================================

/// A liveness control frame, tagged `ping` or `pong` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlFrame {
    /// A liveness probe. The receiver must reply with a PONG echoing the
    /// nonce, if one was carried.
    Ping {
        /// Correlates the expected PONG to this probe.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<Nonce>,
    },

    /// The reply to a PING.
    Pong {
        /// Echo of the probe's nonce, when the peer implements the scheme.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nonce: Option<Nonce>,
    },
}

impl ControlFrame {
    /// Creates a PING carrying the given nonce.
    #[inline]
    #[must_use]
    pub fn ping(nonce: Nonce) -> Self {
        Self::Ping { nonce: Some(nonce) }
    }

    /// Creates a PONG echoing the given nonce, if any.
    #[inline]
    #[must_use]
    pub fn pong(nonce: Option<Nonce>) -> Self {
        Self::Pong { nonce }
    }

    /// Returns the nonce carried by this frame, if any.
    #[inline]
    #[must_use]
    pub fn nonce(&self) -> Option<Nonce> {
        match self {
            Self::Ping { nonce } | Self::Pong { nonce } => *nonce,
        }
    }

    /// Returns `true` if this is a PING.
    #[inline]
    #[must_use]
    pub fn is_ping(&self) -> bool {
        matches!(self, Self::Ping { .. })
    }

    /// Returns `true` if this is a PONG.
    #[inline]
    #[must_use]
    pub fn is_pong(&self) -> bool {
        matches!(self, Self::Pong { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
