//! Observability hooks.
//!
//! The session exposes exactly one boundary to logging and metrics
//! collaborators: a [`LivenessHook`] callback receiving [`LivenessEvent`]
//! values. The crate performs no logging of its own on behalf of the
//! embedding application.
//!
//! # Contract
//!
//! Hooks are invoked inline on the session task, at the exact moment the
//! event occurs. They must not block: a hook that sleeps or performs I/O
//! stalls the heartbeat cycle it is observing. Forward events into a channel
//! if processing is expensive.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use crate::heartbeat::LinkState;
use crate::identifiers::{ConnectionId, Nonce};

// ============================================================================
// LivenessHook
// ============================================================================

/// Observability callback type.
///
/// Called for each [`LivenessEvent`] on the session task. Must not block.
pub type LivenessHook = Box<dyn Fn(LivenessEvent) + Send + Sync>;

// ============================================================================
// LivenessEvent
// ============================================================================

/// Everything observable about a session, in the order it happens.
#[derive(Debug, Clone, PartialEq)]
pub enum LivenessEvent {
    /// A transport connect attempt succeeded and a fresh heartbeat cycle
    /// started for `connection`.
    Connected {
        /// The new connection.
        connection: ConnectionId,
    },

    /// The heartbeat state machine changed state.
    StateChanged {
        /// Connection the transition belongs to.
        connection: ConnectionId,
        /// State before the transition.
        old: LinkState,
        /// State after the transition.
        new: LinkState,
    },

    /// A PING probe was sent.
    PingSent {
        /// Connection the probe was sent on.
        connection: ConnectionId,
        /// Nonce carried by the probe.
        nonce: Nonce,
    },

    /// A PONG reply was accepted.
    PongReceived {
        /// Connection the reply arrived on.
        connection: ConnectionId,
        /// Nonce echoed by the peer, if any.
        nonce: Option<Nonce>,
        /// Probe round-trip time, when it could be attributed to a
        /// specific outstanding PING.
        rtt: Option<Duration>,
    },

    /// The remote peer probed us and was answered with a PONG.
    ///
    /// Independent of the local probe cycle; both peers probe each other.
    RemotePing {
        /// Connection the probe arrived on.
        connection: ConnectionId,
    },

    /// A frame arrived that could not be decoded as a control frame.
    ///
    /// Ignored by the state machine; surfaced here for diagnostics only.
    MalformedFrame {
        /// Connection the frame arrived on.
        connection: ConnectionId,
    },

    /// The connection was declared dead.
    Dead {
        /// The dead connection.
        connection: ConnectionId,
        /// Why the link was declared dead.
        reason: DeadReason,
    },

    /// A reconnect attempt was scheduled.
    ReconnectScheduled {
        /// Session-level attempt number, starting at 0 and reset on every
        /// successful connect.
        attempt: u32,
        /// Jittered delay until the attempt fires.
        delay: Duration,
    },

    /// The session was stopped explicitly. No reconnection follows.
    Stopped,
}

// ============================================================================
// DeadReason
// ============================================================================

/// Why a connection was declared dead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadReason {
    /// The peer failed to answer probes within the configured tolerance.
    PongTimeout {
        /// Consecutive missed beats at the time of death.
        missed_beats: u32,
    },

    /// The transport reported closure that this side did not initiate.
    TransportClosed,

    /// A frame send failed on the write path.
    SendFailed {
        /// Description of the send failure.
        message: String,
    },
}

impl fmt::Display for DeadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PongTimeout { missed_beats } => {
                write!(f, "pong timeout after {missed_beats} missed beat(s)")
            }
            Self::TransportClosed => write!(f, "transport closed"),
            Self::SendFailed { message } => write!(f, "send failed: {message}"),
        }
    }
}

// ============================================================================
// Hooks (internal dispatcher)
// ============================================================================

/// Internal wrapper around the optional hook so call sites stay terse.
pub(crate) struct Hooks(Option<LivenessHook>);

impl Hooks {
    pub(crate) fn new(hook: Option<LivenessHook>) -> Self {
        Self(hook)
    }

    /// Invokes the hook, if one is installed.
    #[inline]
    pub(crate) fn emit(&self, event: LivenessEvent) {
        if let Some(hook) = &self.0 {
            hook(event);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
