//! Profile resolution for commands.
//!
//! The config file and `CAREWATCH_*` environment live in `carewatch-config`;
//! this module layers the global flags on top and hands commands the
//! settings they need.

use std::time::Duration;

use carewatch_config::{Config, Profile};
use carewatch_core::{AlertHistory, MonitorConfig};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;

pub use carewatch_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The active profile with `--url`, `--api`, `--insecure` and `--timeout` applied.
///
/// A missing profile is fine when the flags alone say where the gateway is.
pub fn resolve_profile(global: &GlobalOpts, config: &Config) -> Result<Profile, CliError> {
    let name = active_profile_name(global, config);

    let mut profile = match config.profile(Some(&name)) {
        Ok((_, profile)) => profile.clone(),
        Err(_) if global.url.is_some() || global.api_url.is_some() => Profile::default(),
        Err(_) if global.profile.is_none() && config.profiles.is_empty() => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(url) = &global.url {
        profile.url.clone_from(url);
    }
    if let Some(api) = &global.api_url {
        profile.api_url = Some(api.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    tracing::debug!(profile = %name, url = %profile.url, "resolved profile");
    Ok(profile)
}

/// Monitor settings for `watch`, with its per-invocation overrides.
pub fn monitor_config(
    global: &GlobalOpts,
    args: &WatchArgs,
    config: &Config,
) -> Result<MonitorConfig, CliError> {
    let profile = resolve_profile(global, config)?;
    let mut monitor = carewatch_config::profile_to_monitor_config(&profile)?;

    if let Some(heartbeat) = args.heartbeat {
        let heartbeat: Duration = heartbeat.into();
        if heartbeat.is_zero() {
            return Err(CliError::Validation {
                field: "heartbeat".into(),
                reason: "must be greater than zero".into(),
            });
        }
        monitor.heartbeat_timeout = heartbeat;
    }
    if let Some(max_attempts) = args.max_attempts {
        monitor.reconnect.max_attempts = max_attempts;
    }

    Ok(monitor)
}

/// History API client for the active profile.
pub fn history(global: &GlobalOpts, config: &Config) -> Result<AlertHistory, CliError> {
    let profile = resolve_profile(global, config)?;
    let base = carewatch_config::history_url(&profile)?;
    let http = carewatch_config::profile_to_http_config(&profile, &config.defaults);
    Ok(AlertHistory::new(base, &http)?)
}
