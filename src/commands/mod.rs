//! Command implementations for agency.
//!
//! Each command resolves against one agency home (see [`AgencyContext`]).
//! The long-running commands (`dispatch`, `watchdog`) reload `agency.yaml`
//! between iterations; the rest load it once.

mod add;
mod block;
mod dispatch;
mod gate;
mod init;
mod pause;
mod reset;
mod status;
mod watchdog;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::context::AgencyContext;
use crate::error::{AgencyError, Result};
use std::path::PathBuf;

/// Component name for events emitted by one-shot commands.
const COMPONENT: &str = "cli";

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = AgencyContext::resolve(cli.home.as_deref())?;

    match cli.command {
        Command::Init => init::cmd_init(&ctx),
        Command::Dispatch(args) => dispatch::cmd_dispatch(&ctx, args),
        Command::Watchdog(args) => watchdog::cmd_watchdog(&ctx, args),
        Command::Add(args) => add::cmd_add(&ctx, args),
        Command::Status => status::cmd_status(&ctx),
        Command::Block(args) => block::cmd_block(&ctx, args),
        Command::Reset(args) => reset::cmd_reset(&ctx, args),
        Command::Gate(args) => gate::cmd_gate(&ctx, args),
        Command::Pause => pause::cmd_pause(&ctx),
        Command::Resume => pause::cmd_resume(&ctx),
    }
}

fn load_config(ctx: &AgencyContext) -> Result<Config> {
    Config::load_or_default(ctx.config_path())
}

/// The configured workspace, which must already exist.
fn require_workspace(ctx: &AgencyContext, config: &Config) -> Result<PathBuf> {
    let workspace = ctx.workspace_path(&config.workspace);
    if !workspace.is_dir() {
        return Err(AgencyError::UserError(format!(
            "workspace '{}' does not exist\n\n\
             Create it or point `workspace` in {} at the project directory.",
            workspace.display(),
            ctx.config_path().display()
        )));
    }
    Ok(workspace)
}
