//! Agency: a file-driven supervisor for agentic coding pipelines.
//!
//! This is the main entry point for the `agency` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod activity;
mod checks;
mod classify;
mod cli;
mod commands;
mod config;
mod context;
mod dispatcher;
mod error;
mod events;
mod exit_codes;
mod fs;
mod policy;
mod queue;
mod task;
mod watchdog;
mod worker;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `info`).
/// Product logs under `.run/` are written regardless.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse_args();

    match commands::run(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
