// ── Device state store ──
//
// Latest value per device channel plus connectivity, published as whole
// immutable snapshots through a `watch` channel.

use std::sync::Arc;

use tokio::sync::watch;

use crate::codec::SensorEvent;
use crate::model::{ChannelState, ConnectionStatus, DeviceState};
use crate::stream::Observed;

/// Single-writer snapshot store.
///
/// Every mutation builds a new `DeviceState` and swaps it in atomically,
/// so readers never see a half-applied update.
#[derive(Debug)]
pub struct DeviceStore {
    state: watch::Sender<Arc<DeviceState>>,
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(DeviceState::default()));
        Self { state }
    }

    pub fn snapshot(&self) -> Arc<DeviceState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn subscribe(&self) -> Observed<Arc<DeviceState>> {
        Observed::new(self.state.subscribe())
    }

    /// Apply one decoded event and return the resulting snapshot.
    ///
    /// Updates exactly one channel; `Ping` and `Unknown` leave the snapshot
    /// untouched and notify nobody. Re-sending the current value is a no-op.
    pub fn apply_event(&self, event: &SensorEvent) -> Arc<DeviceState> {
        let Some((channel, label)) = event.channel() else {
            return self.snapshot();
        };

        let mut next = None;
        self.state.send_if_modified(|state| {
            if state.channel(channel).is(label) {
                return false;
            }
            let updated = Arc::new(state.with_channel(channel, ChannelState::known(label)));
            next = Some(Arc::clone(&updated));
            *state = updated;
            true
        });
        next.unwrap_or_else(|| self.snapshot())
    }

    /// Change connectivity only, keeping channel values.
    pub fn set_connection(&self, status: ConnectionStatus) {
        self.state.send_if_modified(|state| {
            if state.connection == status {
                return false;
            }
            *state = Arc::new(DeviceState {
                connection: status,
                ..(**state).clone()
            });
            true
        });
    }

    /// Set connectivity and reset every channel to `Unavailable` in one swap.
    pub fn mark_unavailable(&self, status: ConnectionStatus) {
        let next = DeviceState::unavailable(status);
        self.state.send_if_modified(|state| {
            if **state == next {
                return false;
            }
            *state = Arc::new(next);
            true
        });
    }
}
