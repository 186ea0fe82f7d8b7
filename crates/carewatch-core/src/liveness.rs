// ── Liveness monitor ──
//
// Heartbeat deadline for the event socket. Any inbound traffic pushes the
// deadline forward; the connection is declared dead once it passes.

use std::time::Duration;

use tokio::time::Instant;

/// Single re-armable deadline.
///
/// Expiry is reported at most once per arm cycle: [`poll_expired`](Self::poll_expired)
/// disarms the monitor when it fires, and only [`arm`](Self::arm) or
/// [`on_traffic`](Self::on_traffic) start a new cycle.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    timeout: Duration,
    deadline: Option<Instant>,
    expirations: u64,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
            expirations: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a new cycle ending `timeout` after `now`.
    ///
    /// A window too large to represent as an instant never lapses.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = now.checked_add(self.timeout);
    }

    /// Inbound traffic of any kind, valid or not.
    pub fn on_traffic(&mut self, now: Instant) {
        self.arm(now);
    }

    /// Drop the pending deadline. No-op when already disarmed.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Number of cycles that ended in expiry.
    pub fn expirations(&self) -> u64 {
        self.expirations
    }

    /// Report expiry if the deadline has passed at `now`, disarming on fire.
    pub fn poll_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.expirations += 1;
                true
            }
            _ => false,
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
pub(crate) async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(15);

    #[test]
    fn disarmed_never_expires() {
        let mut monitor = LivenessMonitor::new(TIMEOUT);
        let now = Instant::now();
        assert!(!monitor.poll_expired(now + Duration::from_secs(3600)));
        assert_eq!(monitor.expirations(), 0);
    }

    #[test]
    fn fires_exactly_once_per_cycle() {
        let mut monitor = LivenessMonitor::new(TIMEOUT);
        let start = Instant::now();
        monitor.arm(start);

        assert!(!monitor.poll_expired(start + Duration::from_secs(14)));
        assert!(monitor.poll_expired(start + TIMEOUT));
        assert!(!monitor.poll_expired(start + Duration::from_secs(60)));
        assert!(!monitor.is_armed());
        assert_eq!(monitor.expirations(), 1);
    }

    #[test]
    fn deadline_follows_latest_traffic() {
        let mut monitor = LivenessMonitor::new(TIMEOUT);
        let start = Instant::now();
        monitor.arm(start);

        let traffic = start + Duration::from_secs(10);
        monitor.on_traffic(traffic);

        assert!(!monitor.poll_expired(start + Duration::from_secs(20)));
        assert_eq!(monitor.deadline(), Some(traffic + TIMEOUT));
        assert!(monitor.poll_expired(traffic + TIMEOUT));
    }

    #[test]
    fn cancel_prevents_late_firing() {
        let mut monitor = LivenessMonitor::new(TIMEOUT);
        let start = Instant::now();
        monitor.arm(start);
        monitor.cancel();
        monitor.cancel();

        assert!(!monitor.poll_expired(start + Duration::from_secs(30)));
        assert_eq!(monitor.expirations(), 0);
    }

    #[test]
    fn unrepresentable_window_never_expires() {
        let mut monitor = LivenessMonitor::new(Duration::MAX);
        let start = Instant::now();
        monitor.arm(start);
        monitor.on_traffic(start + Duration::from_secs(1));

        assert_eq!(monitor.deadline(), None);
        assert!(!monitor.poll_expired(start + Duration::from_secs(86_400 * 365)));
        assert_eq!(monitor.expirations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_until_waits_for_deadline() {
        let start = Instant::now();
        sleep_until(Some(start + TIMEOUT)).await;
        assert!(Instant::now() >= start + TIMEOUT);
    }
}
