//! Shared configuration for carewatch.
//!
//! TOML profiles merged with `CAREWATCH_` environment variables, and
//! translation to `carewatch_core::MonitorConfig`. The CLI layers its
//! global flags on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use carewatch_core::{AlertRules, HttpConfig, MonitorConfig, ReconnectPolicy};

/// Environment variable prefix for config overrides.
pub const ENV_PREFIX: &str = "CAREWATCH_";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CAREWATCH_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    UnknownProfile { name: String, available: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// HTTP timeout for the alert-history API, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named gateway profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Sensor event socket (e.g., "ws://192.168.4.1:86/ws").
    #[serde(default)]
    pub url: String,

    /// Alert-history API base. Derived from `url` when unset.
    pub api_url: Option<String>,

    /// Silence window in seconds before the link is declared dead.
    pub heartbeat_timeout_secs: Option<u64>,

    /// WebSocket handshake timeout in seconds.
    pub connect_timeout_secs: Option<u64>,

    /// First reconnect delay in milliseconds; doubles per attempt.
    pub reconnect_base_ms: Option<u64>,

    /// Reconnect attempts before giving up.
    pub max_attempts: Option<u32>,

    /// Accept self-signed certificates on the history API.
    pub insecure: Option<bool>,

    /// Override HTTP timeout.
    pub timeout: Option<u64>,

    /// Alert trigger labels, when the gateway firmware differs from stock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<AlertRules>,
}

impl Config {
    /// Look up a profile by name, falling back to the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");

        self.profiles
            .get(name)
            .map(|p| (name.to_owned(), p))
            .ok_or_else(|| {
                let mut available: Vec<_> = self.profiles.keys().map(String::as_str).collect();
                available.sort_unstable();
                ConfigError::UnknownProfile {
                    name: name.to_owned(),
                    available: if available.is_empty() {
                        "none".into()
                    } else {
                        available.join(", ")
                    },
                }
            })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `CAREWATCH_CONFIG`, then platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "carewatch", "carewatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("carewatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path, still honoring `CAREWATCH_` overrides.
///
/// Nested keys use a double underscore:
/// `CAREWATCH_PROFILES__HOME__URL=ws://10.0.0.2:86/ws`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

fn positive_secs(field: &str, value: Option<u64>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(0) => Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        }),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

/// Validate the event socket URL: `ws` or `wss` with a host.
pub fn event_url(raw: &str) -> Result<Url, ConfigError> {
    let url = parse_url("url", raw)?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ConfigError::Validation {
            field: "url".into(),
            reason: format!("expected a ws:// or wss:// URL, got '{raw}'"),
        });
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Validation {
            field: "url".into(),
            reason: format!("missing host in '{raw}'"),
        });
    }
    Ok(url)
}

/// History API base for a profile.
///
/// Uses `api_url` when set; otherwise the gateway serves the API on the
/// same host and port as the event socket, over HTTP(S) at the root.
pub fn history_url(profile: &Profile) -> Result<Url, ConfigError> {
    if let Some(raw) = &profile.api_url {
        let url = parse_url("api_url", raw)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "api_url".into(),
                reason: format!("expected an http:// or https:// URL, got '{raw}'"),
            });
        }
        return Ok(url);
    }

    let events = event_url(&profile.url)?;
    let scheme = if events.scheme() == "wss" { "https" } else { "http" };
    let host = events.host_str().unwrap_or_default();
    let base = match events.port() {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    };
    parse_url("url", &base)
}

/// Build a `MonitorConfig` from a profile, with no CLI overrides.
pub fn profile_to_monitor_config(profile: &Profile) -> Result<MonitorConfig, ConfigError> {
    let url = event_url(&profile.url)?;

    let defaults = ReconnectPolicy::default();
    let base_delay = match profile.reconnect_base_ms {
        None => defaults.base_delay,
        Some(0) => {
            return Err(ConfigError::Validation {
                field: "reconnect_base_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Some(ms) => Duration::from_millis(ms),
    };

    Ok(MonitorConfig {
        url,
        heartbeat_timeout: positive_secs(
            "heartbeat_timeout_secs",
            profile.heartbeat_timeout_secs,
            MonitorConfig::DEFAULT_HEARTBEAT_TIMEOUT,
        )?,
        connect_timeout: positive_secs(
            "connect_timeout_secs",
            profile.connect_timeout_secs,
            MonitorConfig::DEFAULT_CONNECT_TIMEOUT,
        )?,
        reconnect: ReconnectPolicy {
            base_delay,
            max_attempts: profile.max_attempts.unwrap_or(defaults.max_attempts),
        },
        rules: profile.labels.clone().unwrap_or_default(),
    })
}

/// HTTP settings for the history API.
pub fn profile_to_http_config(profile: &Profile, defaults: &Defaults) -> HttpConfig {
    HttpConfig {
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        accept_invalid_certs: profile.insecure.unwrap_or(false),
    }
}
