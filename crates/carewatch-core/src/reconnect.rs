// ── Reconnection policy ──
//
// Exponential backoff with a bounded attempt budget.

use std::time::Duration;

/// Stateless backoff rule: `delay(n) = base * 2^n`, at most `max_attempts` retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry. Default: 2s.
    pub base_delay: Duration,
    /// Consecutive failed connections tolerated before giving up. Default: 5.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-indexed). Saturates instead of overflowing.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.checked_mul(factor).unwrap_or(Duration::MAX)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Attempt counter owned by the connection manager.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl ReconnectState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    /// Budget spent; only a fresh activation recovers.
    pub fn is_exhausted(&self) -> bool {
        !self.policy.should_retry(self.attempt)
    }

    /// Called on a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Consume one attempt and return its delay, or `None` once exhausted.
    pub fn schedule(&mut self) -> Option<Duration> {
        if !self.policy.should_retry(self.attempt) {
            return None;
        }
        let delay = self.policy.next_delay(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}
