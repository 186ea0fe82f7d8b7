// ── Alert derivation ──
//
// Maps a device snapshot to at most one modal alert, and latches it until
// a consumer dismisses it.

use std::ops::Deref;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::model::{Alert, AlertKind, DeviceState};

/// Channel labels that trigger alerts.
///
/// The label set belongs to the gateway, so it is data rather than code.
/// Defaults match the stock gateway firmware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRules {
    /// Button label meaning "pressed".
    pub button_pressed: String,
    /// Fall label meaning "fall detected".
    pub fall_detected: String,
    /// Environment label for gas and smoke together.
    pub gas_and_smoke: String,
    pub smoke: String,
    pub gas_leak: String,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            button_pressed: "Apertado".into(),
            fall_detected: "Queda Detectada".into(),
            gas_and_smoke: "Gás e Fumaça Detectados".into(),
            smoke: "Fumaça Detectada".into(),
            gas_leak: "Vazamento de Gás".into(),
        }
    }
}

impl AlertRules {
    /// Highest-priority condition present in `state`, if any.
    ///
    /// Priority: panic button, fall, gas and smoke, smoke, gas leak.
    pub fn derive(&self, state: &DeviceState) -> Option<Alert> {
        self.derive_kind(state).map(Alert::from)
    }

    pub fn derive_kind(&self, state: &DeviceState) -> Option<AlertKind> {
        if state.button.is(&self.button_pressed) {
            return Some(AlertKind::PanicButton);
        }
        if state.fall.is(&self.fall_detected) {
            return Some(AlertKind::Fall);
        }

        let env = &state.environment;
        if env.is(&self.gas_and_smoke) {
            Some(AlertKind::GasAndSmoke)
        } else if env.is(&self.smoke) {
            Some(AlertKind::Smoke)
        } else if env.is(&self.gas_leak) {
            Some(AlertKind::GasLeak)
        } else {
            None
        }
    }
}

// ── AlertLatch ──────────────────────────────────────────────────────

/// Sticky holder for the active alert.
///
/// While an alert is active, re-evaluation never replaces it, even if a
/// higher-priority condition appears or the original one clears.
#[derive(Debug)]
pub struct AlertLatch {
    rules: AlertRules,
    active: watch::Sender<Option<Alert>>,
}

impl AlertLatch {
    pub fn new(rules: AlertRules) -> Self {
        let (active, _) = watch::channel(None);
        Self { rules, active }
    }

    pub fn rules(&self) -> &AlertRules {
        &self.rules
    }

    pub fn active(&self) -> Option<Alert> {
        self.active.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Alert>> {
        self.active.subscribe()
    }

    /// Raise an alert for `state` unless one is already active.
    /// Returns `true` if a new alert was raised.
    pub fn evaluate(&self, state: &DeviceState) -> bool {
        self.active.send_if_modified(|active| {
            if active.is_some() {
                return false;
            }
            match self.rules.derive(state) {
                Some(alert) => {
                    info!(kind = %alert.kind, "alert raised");
                    *active = Some(alert);
                    true
                }
                None => false,
            }
        })
    }

    /// Clear the active alert and immediately re-evaluate the snapshot
    /// returned by `current`.
    ///
    /// `current` runs while the latch is held, so an update racing the
    /// dismissal is either seen here or evaluated afterwards. A condition
    /// that still holds raises again; a resolved one leaves no alert.
    /// Subscribers are always notified.
    pub fn dismiss<S>(&self, current: impl FnOnce() -> S) -> Option<Alert>
    where
        S: Deref<Target = DeviceState>,
    {
        let mut next = None;
        self.active.send_modify(|active| {
            if let Some(prev) = active.take() {
                info!(kind = %prev.kind, "alert dismissed");
            }
            *active = self.rules.derive(&current());
            next.clone_from(active);
        });
        next
    }
}
