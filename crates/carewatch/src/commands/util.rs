//! Shared helpers for command handlers.

use std::io::IsTerminal;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is required.
pub fn confirm(message: &str, yes_flag: bool, action: &str) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Which end of a day a bare date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEdge {
    Start,
    End,
}

/// Parse a `--since`/`--until` bound: a full gateway timestamp, or a bare
/// `YYYY-MM-DD` widened to the start or end of that day.
pub fn parse_time_bound(field: &str, raw: &str, edge: DayEdge) -> Result<NaiveDateTime, CliError> {
    if let Some(ts) = carewatch_core::parse_timestamp(raw) {
        return Ok(ts);
    }

    let invalid = || CliError::Validation {
        field: field.into(),
        reason: format!("expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS, got '{raw}'"),
    };
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    let ts = match edge {
        DayEdge::Start => date.and_hms_opt(0, 0, 0),
        DayEdge::End => date.and_hms_opt(23, 59, 59),
    };
    ts.ok_or_else(invalid)
}
