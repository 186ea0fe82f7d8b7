// ── Connection manager ──
//
// Owns the event-socket lifecycle for one activation: open, read until the
// link dies, back off, retry. The state machine is synchronous and takes
// time as an argument; `run` is the async driver that feeds it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use strum::{AsRefStr, Display};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use carewatch_api::{EventSocket, Inbound, Transport};

use crate::alert::AlertLatch;
use crate::codec::{self, SensorEvent};
use crate::config::MonitorConfig;
use crate::liveness::{self, LivenessMonitor};
use crate::model::ConnectionStatus;
use crate::reconnect::ReconnectState;
use crate::store::DeviceStore;

// ── LinkState ────────────────────────────────────────────────────────

/// Lifecycle phase of the connection manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LinkState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

// ── LinkStats ────────────────────────────────────────────────────────

/// Observability counters for the event link.
///
/// Counters accumulate over the lifetime of the monitor; the reconnect
/// fields describe the current activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub link: LinkState,
    /// Successful opens.
    pub connections: u64,
    /// Failed opens plus mid-stream transport errors.
    pub transport_errors: u64,
    pub decode_failures: u64,
    pub liveness_expirations: u64,
    /// Retries consumed since the last successful open.
    pub reconnect_attempt: u32,
    pub max_attempts: u32,
    /// Retry budget spent; stays disconnected until re-activated.
    pub exhausted: bool,
    pub last_traffic: Option<DateTime<Utc>>,
}

// ── CloseCause ───────────────────────────────────────────────────────

/// Why a connection attempt or session ended.
#[derive(Debug)]
pub enum CloseCause {
    PeerClosed,
    TransportError(carewatch_api::Error),
    LivenessExpired,
    OpenFailed(carewatch_api::Error),
}

// ── Shared ───────────────────────────────────────────────────────────

/// State published to consumers, shared between the monitor handle and
/// the connection task.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) store: DeviceStore,
    pub(crate) alerts: AlertLatch,
    pub(crate) stats: watch::Sender<LinkStats>,
}

impl Shared {
    pub(crate) fn new(config: &MonitorConfig) -> Self {
        let (stats, _) = watch::channel(LinkStats {
            max_attempts: config.reconnect.max_attempts,
            ..LinkStats::default()
        });
        Self {
            store: DeviceStore::new(),
            alerts: AlertLatch::new(config.rules.clone()),
            stats,
        }
    }

    /// Publish the idle state. Idempotent.
    pub(crate) fn settle_idle(&self) {
        self.store.mark_unavailable(ConnectionStatus::Disconnected);
        self.stats.send_if_modified(|stats| {
            let changed = stats.link != LinkState::Idle;
            stats.link = LinkState::Idle;
            changed
        });
    }
}

// ── ConnectionManager ────────────────────────────────────────────────

/// Connection state machine for one activation.
pub(crate) struct ConnectionManager {
    state: LinkState,
    liveness: LivenessMonitor,
    reconnect: ReconnectState,
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub(crate) fn new(config: &MonitorConfig, shared: Arc<Shared>) -> Self {
        shared.stats.send_modify(|stats| {
            stats.reconnect_attempt = 0;
            stats.max_attempts = config.reconnect.max_attempts;
            stats.exhausted = false;
        });
        Self {
            state: LinkState::Idle,
            liveness: LivenessMonitor::new(config.heartbeat_timeout),
            reconnect: ReconnectState::new(config.reconnect),
            shared,
        }
    }

    pub(crate) fn liveness_deadline(&self) -> Option<Instant> {
        self.liveness.deadline()
    }

    fn enter(&mut self, state: LinkState) {
        self.state = state;
        self.shared.stats.send_modify(|stats| stats.link = state);
    }

    pub(crate) fn begin_connect(&mut self) {
        self.enter(LinkState::Connecting);
        self.shared.store.set_connection(ConnectionStatus::Connecting);
    }

    pub(crate) fn on_open(&mut self, now: Instant) {
        self.reconnect.reset();
        self.liveness.arm(now);
        self.shared.stats.send_modify(|stats| {
            stats.connections += 1;
            stats.reconnect_attempt = 0;
        });
        self.enter(LinkState::Connected);
        self.shared.store.set_connection(ConnectionStatus::Connected);
        info!("event socket connected");
    }

    /// Any inbound item counts as traffic, valid or not.
    pub(crate) fn on_inbound(&mut self, now: Instant, inbound: Inbound) {
        self.liveness.on_traffic(now);
        self.shared
            .stats
            .send_modify(|stats| stats.last_traffic = Some(Utc::now()));

        let Inbound::Text(text) = inbound else {
            trace!("control frame");
            return;
        };

        match codec::decode(&text) {
            Ok(SensorEvent::Ping) => trace!("ping"),
            Ok(SensorEvent::Unknown { kind }) => debug!(%kind, "ignoring unknown frame type"),
            Ok(event) => {
                let snapshot = self.shared.store.apply_event(&event);
                self.shared.alerts.evaluate(&snapshot);
            }
            Err(e) => {
                debug!(error = %e, frame = %text, "dropping malformed frame");
                self.shared
                    .stats
                    .send_modify(|stats| stats.decode_failures += 1);
            }
        }
    }

    /// Whether the heartbeat window has lapsed at `now`. Fires once per cycle.
    pub(crate) fn poll_liveness(&mut self, now: Instant) -> bool {
        let expired = self.liveness.poll_expired(now);
        if expired {
            let total = self.liveness.expirations();
            self.shared.stats.send_modify(|stats| stats.liveness_expirations += 1);
            warn!(
                timeout = ?self.liveness.timeout(),
                total,
                "no traffic within heartbeat window"
            );
        }
        expired
    }

    /// Count a transport failure and surface it as `Error` until the close
    /// is processed.
    pub(crate) fn on_error(&mut self, error: &carewatch_api::Error) {
        warn!(from = %self.state, %error, "event socket failed");
        self.shared.stats.send_modify(|stats| stats.transport_errors += 1);
        self.shared.store.set_connection(ConnectionStatus::Error);
    }

    /// Tear down after a close and consult the retry budget.
    ///
    /// Returns the delay before the next attempt, or `None` once the
    /// budget is exhausted.
    pub(crate) fn on_close(&mut self, cause: CloseCause) -> Option<Duration> {
        self.liveness.cancel();

        let from = self.state;
        match &cause {
            CloseCause::PeerClosed => info!(%from, "event socket closed by peer"),
            CloseCause::LivenessExpired => info!(%from, "closing silent event socket"),
            CloseCause::TransportError(_) | CloseCause::OpenFailed(_) => {
                debug!(%from, "tearing down after transport error");
            }
        }

        self.enter(LinkState::Disconnected);
        self.shared
            .store
            .mark_unavailable(ConnectionStatus::Disconnected);

        let delay = self.reconnect.schedule();
        let attempt = self.reconnect.attempt();
        self.shared.stats.send_modify(|stats| {
            stats.reconnect_attempt = attempt;
            stats.exhausted = delay.is_none();
        });

        match delay {
            Some(delay) => debug!(
                attempt,
                max_attempts = self.reconnect.max_attempts(),
                ?delay,
                "scheduling reconnect"
            ),
            None => error!(
                attempts = attempt,
                "reconnect budget exhausted, staying disconnected until re-activated"
            ),
        }
        delay
    }

    pub(crate) fn on_deactivate(&mut self) {
        self.liveness.cancel();
        self.state = LinkState::Idle;
        self.shared.settle_idle();
    }
}

// ── Driver ───────────────────────────────────────────────────────────

/// Drive `manager` until cancelled or until the retry budget runs out.
///
/// Frame processing, liveness expiry and the retry timer are serialized
/// here, so the state machine never needs a lock.
pub(crate) async fn run<T: Transport>(
    transport: Arc<T>,
    url: Url,
    mut manager: ConnectionManager,
    cancel: CancellationToken,
) {
    loop {
        manager.begin_connect();
        debug!(%url, "opening event socket");

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = transport.open(&url) => result,
        };

        let cause = match opened {
            Ok(mut socket) => {
                manager.on_open(Instant::now());
                let cause = read_until_closed(&mut manager, &mut socket, &cancel).await;
                socket.close().await;
                match cause {
                    Some(cause) => cause,
                    None => break,
                }
            }
            Err(e) => CloseCause::OpenFailed(e),
        };

        if let CloseCause::TransportError(e) | CloseCause::OpenFailed(e) = &cause {
            manager.on_error(e);
            // Give subscribers a turn to observe `Error` before the reset.
            tokio::task::yield_now().await;
        }

        let Some(delay) = manager.on_close(cause) else {
            return;
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    manager.on_deactivate();
    debug!("connection task stopped");
}

/// Pump one open socket. `None` means cancelled.
async fn read_until_closed<S: EventSocket>(
    manager: &mut ConnectionManager,
    socket: &mut S,
    cancel: &CancellationToken,
) -> Option<CloseCause> {
    loop {
        let deadline = manager.liveness_deadline();
        tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            item = socket.next() => match item {
                Some(Ok(inbound)) => manager.on_inbound(Instant::now(), inbound),
                Some(Err(e)) => return Some(CloseCause::TransportError(e)),
                None => return Some(CloseCause::PeerClosed),
            },
            () = liveness::sleep_until(deadline) => {
                if manager.poll_liveness(Instant::now()) {
                    return Some(CloseCause::LivenessExpired);
                }
            }
        }
    }
}
