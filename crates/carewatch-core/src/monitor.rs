// ── Sensor monitor ──
//
// Consumer-facing handle: activation lifecycle plus observable device
// state, active alert and link statistics.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use carewatch_api::{Transport, WebSocketTransport};

use crate::config::MonitorConfig;
use crate::connection::{self, ConnectionManager, LinkStats, Shared};
use crate::model::{Alert, DeviceState};
use crate::stream::Observed;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`; every clone observes the
/// same connection. Nothing connects until [`activate()`](Self::activate).
pub struct SensorMonitor<T: Transport = WebSocketTransport> {
    inner: Arc<MonitorInner<T>>,
}

impl<T: Transport> Clone for SensorMonitor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct MonitorInner<T: Transport> {
    config: MonitorConfig,
    transport: Arc<T>,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

/// One activation: the connection task and the token that stops it.
struct Session {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SensorMonitor {
    /// Monitor over a real WebSocket transport.
    pub fn new(config: MonitorConfig) -> Self {
        let transport = WebSocketTransport::new(config.connect_timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> SensorMonitor<T> {
    pub fn with_transport(config: MonitorConfig, transport: T) -> Self {
        let shared = Arc::new(Shared::new(&config));
        Self {
            inner: Arc::new(MonitorInner {
                config,
                transport: Arc::new(transport),
                shared,
                session: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start connecting in the background.
    ///
    /// No-op while a session is running. After the retry budget is
    /// exhausted, activating again starts a fresh session with a full budget.
    pub async fn activate(&self) {
        let mut session = self.inner.session.lock().await;
        if session.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            debug!("monitor already active");
            return;
        }

        let cancel = CancellationToken::new();
        let manager = ConnectionManager::new(&self.inner.config, Arc::clone(&self.inner.shared));
        let handle = tokio::spawn(connection::run(
            Arc::clone(&self.inner.transport),
            self.inner.config.url.clone(),
            manager,
            cancel.clone(),
        ));
        *session = Some(Session { cancel, handle });
        info!(url = %self.inner.config.url, "monitor activated");
    }

    /// Stop the connection and wait for it to wind down.
    ///
    /// Cancels the pending reconnect timer and liveness deadline and closes
    /// the socket. Once this returns nothing further is published until the
    /// next activation. Idempotent.
    pub async fn deactivate(&self) {
        let Some(session) = self.inner.session.lock().await.take() else {
            return;
        };

        session.cancel.cancel();
        if let Err(e) = session.handle.await {
            warn!(error = %e, "connection task ended abnormally");
        }
        self.inner.shared.settle_idle();
        info!("monitor deactivated");
    }

    /// Whether a connection task is currently running.
    pub async fn is_active(&self) -> bool {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<DeviceState> {
        self.inner.shared.store.snapshot()
    }

    /// Subscribe to `(connection, environment, button, fall)` snapshots.
    pub fn state(&self) -> Observed<Arc<DeviceState>> {
        self.inner.shared.store.subscribe()
    }

    /// Subscribe to the active alert.
    pub fn alerts(&self) -> Observed<Option<Alert>> {
        Observed::new(self.inner.shared.alerts.subscribe())
    }

    pub fn active_alert(&self) -> Option<Alert> {
        self.inner.shared.alerts.active()
    }

    /// Acknowledge the active alert on screen.
    ///
    /// Re-evaluates the current snapshot immediately, so a condition that
    /// still holds is raised again. Returns the alert now active, if any.
    pub fn dismiss_alert(&self) -> Option<Alert> {
        let store = &self.inner.shared.store;
        self.inner.shared.alerts.dismiss(|| store.snapshot())
    }

    pub fn stats(&self) -> Observed<LinkStats> {
        Observed::new(self.inner.shared.stats.subscribe())
    }

    pub fn link_stats(&self) -> LinkStats {
        self.inner.shared.stats.borrow().clone()
    }
}

impl<T: Transport> Drop for MonitorInner<T> {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel.cancel();
        }
    }
}
