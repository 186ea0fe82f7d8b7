// ── Domain model ──
//
// Connection status, per-channel device values, the consolidated
// snapshot handed to consumers, and the modal alert derived from it.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ── ConnectionStatus ────────────────────────────────────────────────

/// Connectivity of the event stream as seen by consumers.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Transport reported an error; a `Disconnected` transition follows.
    Error,
}

// ── DeviceChannel ───────────────────────────────────────────────────

/// One of the three independent device signals.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceChannel {
    /// Gas / smoke sensor.
    Environment,
    /// Panic button.
    Button,
    /// Fall detector.
    Fall,
}

// ── ChannelState ────────────────────────────────────────────────────

/// Value of a single channel.
///
/// Labels are an open contract with the gateway, so they stay strings.
/// `Unavailable` means "we don't currently know" and never collides with
/// a label the gateway can send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelState {
    Known(String),
    #[default]
    Unavailable,
}

impl ChannelState {
    pub fn known(label: impl Into<String>) -> Self {
        Self::Known(label.into())
    }

    /// The last reported label, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Known(label) => Some(label),
            Self::Unavailable => None,
        }
    }

    /// Whether the channel currently reports exactly `label`.
    pub fn is(&self, label: &str) -> bool {
        self.label() == Some(label)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(label) => f.write_str(label),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

// ── DeviceState ─────────────────────────────────────────────────────

/// Point-in-time snapshot: connectivity plus the latest value per channel.
///
/// Immutable once published; the store swaps whole snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub connection: ConnectionStatus,
    pub environment: ChannelState,
    pub button: ChannelState,
    pub fall: ChannelState,
}

impl DeviceState {
    /// All channels unknown, with the given connectivity.
    pub fn unavailable(connection: ConnectionStatus) -> Self {
        Self {
            connection,
            ..Self::default()
        }
    }

    pub fn channel(&self, channel: DeviceChannel) -> &ChannelState {
        match channel {
            DeviceChannel::Environment => &self.environment,
            DeviceChannel::Button => &self.button,
            DeviceChannel::Fall => &self.fall,
        }
    }

    /// Copy of `self` with one channel replaced.
    pub fn with_channel(&self, channel: DeviceChannel, value: ChannelState) -> Self {
        let mut next = self.clone();
        match channel {
            DeviceChannel::Environment => next.environment = value,
            DeviceChannel::Button => next.button = value,
            DeviceChannel::Fall => next.fall = value,
        }
        next
    }
}

// ── Alert ───────────────────────────────────────────────────────────

/// Conditions that raise a modal alert, highest priority first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertKind {
    PanicButton,
    Fall,
    GasAndSmoke,
    Smoke,
    GasLeak,
}

impl AlertKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::PanicButton => "Panic button pressed",
            Self::Fall => "Fall alert",
            Self::GasAndSmoke => "Gas and smoke alert",
            Self::Smoke => "Smoke alert",
            Self::GasLeak => "Gas alert",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::PanicButton => {
                "The panic button was pressed. Check on the situation immediately."
            }
            Self::Fall => "A possible fall was detected.",
            Self::GasAndSmoke => "Dangerous levels of gas and smoke were detected.",
            Self::Smoke => "Smoke was detected in the room.",
            Self::GasLeak => "A gas leak was detected.",
        }
    }
}

/// A condition that needs human acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
}

impl From<AlertKind> for Alert {
    fn from(kind: AlertKind) -> Self {
        Self {
            kind,
            title: kind.title().to_owned(),
            message: kind.message().to_owned(),
        }
    }
}
