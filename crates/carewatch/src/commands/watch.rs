//! `watch`: follow the event socket and print state changes and alerts.
//!
//! Table and plain output are one human-readable line per event; JSON
//! formats emit one compact object per line and YAML one document per event.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use carewatch_core::{Alert, ConnectionStatus, DeviceState, LinkStats, SensorMonitor};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Event lines ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchLine<'a> {
    State {
        at: DateTime<Local>,
        #[serde(flatten)]
        state: &'a DeviceState,
    },
    Alert {
        at: DateTime<Local>,
        /// Raised again right after a dismissal because the condition holds.
        repeated: bool,
        #[serde(flatten)]
        alert: &'a Alert,
    },
    Dismissed {
        at: DateTime<Local>,
    },
}

struct Printer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn new(global: &GlobalOpts) -> Self {
        Self {
            format: global.output.clone(),
            color: matches!(global.output, OutputFormat::Table)
                && output::should_color(&global.color),
            quiet: global.quiet,
        }
    }

    fn emit(&self, line: &WatchLine<'_>, text: impl FnOnce() -> String) -> Result<(), CliError> {
        let out = match self.format {
            OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(line)?,
            OutputFormat::Yaml => format!("---\n{}", output::render_yaml(line)?.trim_end()),
            OutputFormat::Table | OutputFormat::Plain => text(),
        };
        output::print_output(&out, false);
        Ok(())
    }

    /// Device snapshots are suppressed by `--quiet`; alerts never are.
    fn state(&self, state: &DeviceState) -> Result<(), CliError> {
        if self.quiet {
            return Ok(());
        }
        let at = Local::now();
        self.emit(&WatchLine::State { at, state }, || {
            let status = format!("{:<12}", state.connection.as_ref());
            let status = if self.color {
                match state.connection {
                    ConnectionStatus::Connected => status.green().to_string(),
                    ConnectionStatus::Connecting => status.yellow().to_string(),
                    ConnectionStatus::Disconnected | ConnectionStatus::Error => {
                        status.red().to_string()
                    }
                }
            } else {
                status
            };
            format!(
                "{}  {status}  environment={}  button={}  fall={}",
                at.format("%H:%M:%S"),
                state.environment,
                state.button,
                state.fall,
            )
        })
    }

    fn alert(&self, alert: &Alert, repeated: bool) -> Result<(), CliError> {
        let at = Local::now();
        self.emit(
            &WatchLine::Alert {
                at,
                repeated,
                alert,
            },
            || {
                let tag = if repeated { "ALERT (still active)" } else { "ALERT" };
                let tag = if self.color {
                    tag.red().bold().to_string()
                } else {
                    tag.to_owned()
                };
                format!(
                    "{}  {tag}  {}: {}",
                    at.format("%H:%M:%S"),
                    alert.title,
                    alert.message
                )
            },
        )
    }

    fn dismissed(&self) -> Result<(), CliError> {
        let at = Local::now();
        self.emit(&WatchLine::Dismissed { at }, || {
            format!("{}  dismissed", at.format("%H:%M:%S"))
        })
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let monitor_config = config::monitor_config(global, &args, &cfg)?;
    let url = monitor_config.url.to_string();
    let monitor = SensorMonitor::new(monitor_config);
    let printer = Printer::new(global);

    monitor.activate().await;
    let outcome = follow(&monitor, &printer, &args, &url).await;
    monitor.deactivate().await;

    let stats = monitor.link_stats();
    info!(
        connections = stats.connections,
        transport_errors = stats.transport_errors,
        decode_failures = stats.decode_failures,
        liveness_expirations = stats.liveness_expirations,
        "watch finished"
    );
    outcome
}

async fn follow(
    monitor: &SensorMonitor,
    printer: &Printer,
    args: &WatchArgs,
    url: &str,
) -> Result<(), CliError> {
    let mut state = monitor.state();
    let mut alerts = monitor.alerts();
    let mut stats = monitor.stats();

    printer.state(state.current())?;
    // The budget can run out before we subscribed.
    link_alive(stats.current(), url)?;

    // A duration past the end of representable time means no limit.
    let stop_at = args
        .duration
        .and_then(|d| Instant::now().checked_add(Duration::from(d)));
    // Last alert value printed; notifications caused by our own dismissals
    // carry the same value and are skipped.
    let mut shown: Option<Alert> = alerts.current().clone();
    if let Some(alert) = &shown {
        printer.alert(alert, false)?;
    }

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "cannot listen for Ctrl-C");
                }
                debug!("interrupted");
                return Ok(());
            }
            () = sleep_until(stop_at) => {
                debug!("watch duration elapsed");
                return Ok(());
            }
            Some(snapshot) = state.changed() => {
                on_state(monitor, printer, args.dismiss, &snapshot, &mut shown)?;
            }
            Some(alert) = alerts.changed() => {
                on_alert(monitor, printer, args.dismiss, alert, &mut shown)?;
            }
            Some(link) = stats.changed() => link_alive(&link, url)?,
        }
    }
}

fn link_alive(link: &LinkStats, url: &str) -> Result<(), CliError> {
    if link.exhausted {
        return Err(CliError::LinkLost {
            url: url.to_owned(),
            attempts: link.max_attempts,
        });
    }
    Ok(())
}

fn on_state(
    monitor: &SensorMonitor,
    printer: &Printer,
    dismiss: bool,
    snapshot: &Arc<DeviceState>,
    shown: &mut Option<Alert>,
) -> Result<(), CliError> {
    printer.state(snapshot)?;
    // A re-raised alert is dismissed again once per state change, not in a loop.
    if dismiss && shown.is_some() {
        *shown = acknowledge(monitor, printer)?;
    }
    Ok(())
}

fn on_alert(
    monitor: &SensorMonitor,
    printer: &Printer,
    dismiss: bool,
    alert: Option<Alert>,
    shown: &mut Option<Alert>,
) -> Result<(), CliError> {
    if alert == *shown {
        return Ok(());
    }
    match alert {
        Some(alert) => {
            printer.alert(&alert, false)?;
            *shown = Some(alert);
            if dismiss {
                *shown = acknowledge(monitor, printer)?;
            }
        }
        None => {
            printer.dismissed()?;
            *shown = None;
        }
    }
    Ok(())
}

/// Dismiss the active alert and report what, if anything, replaced it.
fn acknowledge(monitor: &SensorMonitor, printer: &Printer) -> Result<Option<Alert>, CliError> {
    let next = monitor.dismiss_alert();
    printer.dismissed()?;
    if let Some(alert) = &next {
        printer.alert(alert, true)?;
    }
    Ok(next)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
