//! Command dispatch: bridges CLI args to the monitor, the history API and
//! output formatting.

pub mod alerts;
pub mod config_cmd;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Alerts(args) => alerts::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        // Generated in main before dispatch.
        Command::Completions(_) => Ok(()),
    }
}
