// ── Runtime configuration for the sensor monitor ──

use std::time::Duration;

use url::Url;

use crate::alert::AlertRules;
use crate::reconnect::ReconnectPolicy;

/// Configuration for a [`SensorMonitor`](crate::SensorMonitor).
///
/// Built by `carewatch-config` from the user's profile, or directly
/// by embedders.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Event socket URL, e.g. `ws://192.168.4.1/ws`.
    pub url: Url,
    /// Silence window after which the connection is declared dead.
    pub heartbeat_timeout: Duration,
    /// Handshake timeout for each connection attempt.
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub rules: AlertRules,
}

impl MonitorConfig {
    pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Defaults for everything but the URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            heartbeat_timeout: Self::DEFAULT_HEARTBEAT_TIMEOUT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
            rules: AlertRules::default(),
        }
    }
}
