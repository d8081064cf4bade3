//! Liveness monitor
//!
//! Detects connections that died without a close. Every `interval`, if
//! connected, a heartbeat is due and a single deadline is armed `timeout`
//! later. A keepalive response disarms it; reaching the deadline asks for
//! a forced refresh of the link.
//!
//! The monitor owns no timers and never reads the clock: the caller passes
//! `now` in and sleeps at most `next_wakeup()`.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct LivenessPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for LivenessPolicy {
    fn default() -> LivenessPolicy {
        LivenessPolicy {
            interval: Duration::from_millis(30000),
            timeout: Duration::from_millis(10000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessAction {
    /// Send a heartbeat now; the response deadline is already armed.
    SendHeartbeat,
    /// The armed deadline passed without a response.
    ForceRefresh,
}

#[derive(Debug)]
pub struct LivenessMonitor {
    policy: LivenessPolicy,
    connected: bool,
    next_beat: Instant,
    deadline: Option<Instant>,
}

impl LivenessMonitor {
    pub fn new(policy: LivenessPolicy, now: Instant) -> LivenessMonitor {
        let next_beat = now + policy.interval;
        LivenessMonitor {
            policy,
            connected: false,
            next_beat,
            deadline: None,
        }
    }

    pub fn connected(&mut self, now: Instant) {
        self.connected = true;
        self.deadline = None;
        self.next_beat = now + self.policy.interval;
    }

    pub fn disconnected(&mut self) {
        self.connected = false;
        self.deadline = None;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True while a heartbeat response is awaited.
    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// A keepalive response arrived. Returns whether it disarmed a deadline.
    pub fn response(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn poll(&mut self, now: Instant) -> Option<LivenessAction> {
        if let Some(deadline) = self.deadline {
            if now >= deadline {
                self.deadline = None;
                return Some(LivenessAction::ForceRefresh);
            }
        }
        if now >= self.next_beat {
            self.next_beat = now + self.policy.interval;
            if self.connected {
                // replaces any deadline still armed
                self.deadline = Some(now + self.policy.timeout);
                return Some(LivenessAction::SendHeartbeat);
            }
        }
        None
    }

    /// Time until `poll` may have something to do.
    pub fn next_wakeup(&self, now: Instant) -> Duration {
        let at = match self.deadline {
            Some(deadline) => std::cmp::min(deadline, self.next_beat),
            None => self.next_beat,
        };
        at.saturating_duration_since(now)
    }
}
