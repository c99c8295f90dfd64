//! Heartbeat and backoff configuration.
//!
//! Both config types are plain immutable data with conservative defaults.
//! Validation happens once, inside [`SessionBuilder::build`], and rejects
//! invalid values outright; nothing is silently clamped.
//!
//! [`SessionBuilder::build`]: crate::session::SessionBuilder::build
//!
//! # Defaults
//!
//! | Option | Default |
//! |--------|---------|
//! | `ping_interval` | 30s |
//! | `pong_timeout` | 5s |
//! | `max_missed_beats` | 1 |
//! | `base_delay` | 1s |
//! | `max_delay` | 30s |
//! | `multiplier` | 2.0 |
//! | `jitter_fraction` | 0.2 |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default interval between liveness probes.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Default wait for a PONG before counting a missed beat.
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of missed beats tolerated before declaring the link dead.
pub const DEFAULT_MAX_MISSED_BEATS: u32 = 1;

/// Default first reconnect delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default cap on the reconnect delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Default growth factor between consecutive reconnect delays.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Default jitter fraction applied to each reconnect delay.
pub const DEFAULT_JITTER_FRACTION: f64 = 0.2;

// ============================================================================
// HeartbeatConfig
// ============================================================================

/// Timing configuration for the heartbeat cycle.
///
/// `pong_timeout` bounds detection latency: a dead link is declared within
/// `pong_timeout * max_missed_beats` of the first unanswered probe, rather
/// than a full `ping_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between PING probes while the link is idle.
    pub ping_interval: Duration,

    /// How long to wait for a PONG before counting a missed beat.
    pub pong_timeout: Duration,

    /// How many consecutive missed beats are tolerated before the link is
    /// declared dead. Must be at least 1.
    pub max_missed_beats: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            max_missed_beats: DEFAULT_MAX_MISSED_BEATS,
        }
    }
}

impl HeartbeatConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any value is out of range.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.ping_interval.is_zero() {
            return Err(Error::config("ping_interval must be positive"));
        }
        if self.pong_timeout.is_zero() {
            return Err(Error::config("pong_timeout must be positive"));
        }
        if self.max_missed_beats == 0 {
            return Err(Error::config("max_missed_beats must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// BackoffPolicy
// ============================================================================

/// Reconnect delay policy: exponential growth, capped, with jitter.
///
/// The pre-jitter delay for attempt `n` is
/// `min(max_delay, base_delay * multiplier^n)`. Jitter then randomizes the
/// final delay within `±jitter_fraction` to avoid synchronized retry storms
/// across many clients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,

    /// Upper bound on the delay regardless of attempt count.
    pub max_delay: Duration,

    /// Growth factor between consecutive attempts. Must be >= 1.
    pub multiplier: f64,

    /// Fraction of the delay randomized away in either direction.
    /// Must be within `[0, 1]`.
    pub jitter_fraction: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }
}

impl BackoffPolicy {
    /// Computes the pre-jitter delay for the given attempt number.
    ///
    /// Attempt numbering starts at 0 (the first reconnect after a death).
    /// The result is non-decreasing in `attempt` and never exceeds
    /// `max_delay`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let raw = self.base_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(raw.min(self.max_delay.as_secs_f64()))
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any value is out of range.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.base_delay.is_zero() {
            return Err(Error::config("backoff base_delay must be positive"));
        }
        if self.max_delay < self.base_delay {
            return Err(Error::config("backoff max_delay must be >= base_delay"));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(Error::config("backoff multiplier must be >= 1"));
        }
        if !self.jitter_fraction.is_finite() || !(0.0..=1.0).contains(&self.jitter_fraction) {
            return Err(Error::config("backoff jitter_fraction must be in [0, 1]"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
