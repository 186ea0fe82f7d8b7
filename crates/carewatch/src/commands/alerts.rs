//! Alert history command handlers.

use tabled::Tabled;

use carewatch_core::{AlertFilter, AlertId, AlertRecord, StatusFilter};

use crate::cli::{AlertsArgs, AlertsCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::{self, DayEdge};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Type")]
    alert_type: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Acknowledged By")]
    acknowledged_by: String,
    #[tabled(rename = "At")]
    acknowledged_at: String,
}

impl From<&AlertRecord> for AlertRow {
    fn from(r: &AlertRecord) -> Self {
        let (by, at) = if r.is_acknowledged() {
            (
                r.acknowledged_by.clone().unwrap_or_default(),
                r.acknowledged_at.clone().unwrap_or_default(),
            )
        } else {
            ("-".into(), "-".into())
        };
        Self {
            id: r.id.to_string(),
            timestamp: r.timestamp.clone(),
            alert_type: r.alert_type.clone(),
            message: r.message.clone(),
            acknowledged_by: by,
            acknowledged_at: at,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: AlertsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let history = config::history(global, &cfg)?;

    match args.command {
        AlertsCommand::List {
            pending,
            acknowledged,
            alert_type,
            since,
            until,
            limit,
        } => {
            let status = if pending {
                StatusFilter::Pending
            } else if acknowledged {
                StatusFilter::Acknowledged
            } else {
                StatusFilter::All
            };
            let filter = AlertFilter {
                status,
                alert_type,
                since: since
                    .as_deref()
                    .map(|raw| util::parse_time_bound("since", raw, DayEdge::Start))
                    .transpose()?,
                until: until
                    .as_deref()
                    .map(|raw| util::parse_time_bound("until", raw, DayEdge::End))
                    .transpose()?,
            };

            let mut records = history.list(&filter).await?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }

            let out = output::render_list(
                &global.output,
                &records,
                |r| AlertRow::from(r),
                |r| r.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlertsCommand::Ack { id, user } => {
            let prompt = format!("Acknowledge alert {id} as '{user}'?");
            if !util::confirm(&prompt, global.yes, "alerts ack")? {
                return Ok(());
            }

            let id = AlertId::from(id);
            history.acknowledge(&id, &user).await?;
            if !global.quiet {
                eprintln!("✓ Alert {id} acknowledged by {}", user.trim());
            }
            Ok(())
        }
    }
}
