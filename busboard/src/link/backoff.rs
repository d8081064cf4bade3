//! Reconnection backoff
//!
//! Capped exponential backoff with no attempt limit: the link never gives
//! up on its own.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Multiplier applied after every attempt.
    pub factor: f64,
    /// Upper bound for any single delay.
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> ReconnectPolicy {
        ReconnectPolicy {
            initial: Duration::from_millis(2000),
            factor: 1.25,
            max: Duration::from_millis(10000),
        }
    }
}

/// Yields successive retry delays. Iterating never returns `None`.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    next: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Backoff {
        let next = std::cmp::min(policy.initial, policy.max);
        Backoff {
            policy,
            next,
            attempts: 0,
        }
    }

    /// Returns the delay for the next attempt and advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.attempts = self.attempts.saturating_add(1);
        // factors below 1 would shrink the delay; the sequence is non-decreasing
        let grown = if self.policy.factor > 1.0 {
            Duration::from_nanos((delay.as_nanos() as f64 * self.policy.factor).round() as u64)
        } else {
            delay
        };
        self.next = std::cmp::min(grown, self.policy.max);
        delay
    }

    /// Number of delays handed out since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Called once a connection is established.
    pub fn reset(&mut self) {
        self.next = std::cmp::min(self.policy.initial, self.policy.max);
        self.attempts = 0;
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
