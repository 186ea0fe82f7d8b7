// carewatch-core: Real-time sensor client between carewatch-api and consumers (CLI).
//
// Data flow: socket frames -> codec -> device store -> alert latch -> subscribers.
// The connection manager drives the socket, the liveness deadline and the
// reconnect policy from a single task per activation.

pub mod alert;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod history;
pub mod liveness;
pub mod model;
pub mod monitor;
pub mod reconnect;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alert::{AlertLatch, AlertRules};
pub use codec::{DecodeError, SensorEvent, decode};
pub use config::MonitorConfig;
pub use connection::{CloseCause, LinkState, LinkStats};
pub use error::CoreError;
pub use history::{AlertFilter, AlertHistory, StatusFilter};
pub use liveness::LivenessMonitor;
pub use monitor::SensorMonitor;
pub use reconnect::{ReconnectPolicy, ReconnectState};
pub use store::DeviceStore;
pub use stream::{Observed, ObservedStream};

pub use model::{
    Alert, AlertKind, ChannelState, ConnectionStatus, DeviceChannel, DeviceState,
};

// Transport-level types consumers need alongside the monitor.
pub use carewatch_api::{AlertId, AlertRecord, HttpConfig, Transport, parse_timestamp};
