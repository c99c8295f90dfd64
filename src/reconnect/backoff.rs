//! Retry timing for the reconnect loop.
//!
//! [`RetryTimer`] tracks the session-level attempt counter and derives each
//! wait from the policy: exponential growth capped at `max_delay`, then
//! randomized within `±jitter_fraction` so a fleet of clients recovering
//! from the same outage does not retry in lockstep.
//!
//! The counter is session-level on purpose: a connection that dies right
//! after connecting still drives the next delay upward until a connect
//! attempt actually succeeds, at which point [`RetryTimer::reset`] starts
//! the progression over.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rand::Rng;

use crate::config::BackoffPolicy;

// ============================================================================
// RetryTimer
// ============================================================================

/// Attempt counter plus jittered delay derivation.
#[derive(Debug)]
pub(crate) struct RetryTimer {
    /// The policy delays derive from.
    policy: BackoffPolicy,

    /// Attempts made since the last successful connect.
    attempts: u32,
}

impl RetryTimer {
    /// Creates a timer at attempt 0.
    pub(crate) fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Attempts made since the last successful connect.
    #[inline]
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Resets the progression after a successful connect.
    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Derives the jittered delay for the current attempt and advances the
    /// counter.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.jittered(self.policy.delay(self.attempts));
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Randomizes a delay within `±jitter_fraction`.
    fn jittered(&self, delay: Duration) -> Duration {
        let fraction = self.policy.jitter_fraction;
        if fraction == 0.0 {
            return delay;
        }

        let spread = rand::thread_rng().gen_range(-fraction..=fraction);
        Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + spread))
    }
}

// ============================================================================
// Tests
// ============================================================================
