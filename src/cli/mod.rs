//! CLI argument parsing for agency.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agency: a file-driven supervisor that moves tasks through
/// plan, develop and test workers.
///
/// State lives in the agency home:
/// - `tasks.json` is the task store
/// - `agency.yaml` is the optional runtime config
/// - `.run/` holds logs, the dispatcher pid record and the watchdog stop flag
#[derive(Parser, Debug)]
#[command(name = "agency")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Agency home directory (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for agency.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize an agency home.
    ///
    /// Creates `.run/`, a default `agency.yaml`, an empty task store and the
    /// workspace directory. Existing files are left alone.
    Init,

    /// Run the dispatch loop.
    ///
    /// Evaluates the task store, invokes one worker at a time and applies
    /// each outcome before the next pass.
    Dispatch(DispatchArgs),

    /// Run the watchdog audit loop.
    ///
    /// Restarts a stalled dispatcher and blocks tasks stuck in a loop or
    /// past the retry limit.
    Watchdog(WatchdogArgs),

    /// Add a new pending task.
    Add(AddArgs),

    /// Show task counts per status and the task list.
    Status,

    /// Force a task into `blocked`.
    Block(BlockArgs),

    /// Empty the task store, clear the verdict file and truncate logs.
    Reset(ResetArgs),

    /// Run the definition-of-done gate for a task and print the report.
    ///
    /// Does not change task status.
    Gate(GateArgs),

    /// Stop the watchdog (creates the stop flag).
    Pause,

    /// Allow the watchdog to run again (removes the stop flag).
    Resume,
}

/// Arguments for the `dispatch` command.
#[derive(Parser, Debug)]
pub struct DispatchArgs {
    /// Run passes until idle once and exit.
    #[arg(long)]
    pub once: bool,

    /// Poll interval in milliseconds (overrides `dispatch_interval_ms`).
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

/// Arguments for the `watchdog` command.
#[derive(Parser, Debug)]
pub struct WatchdogArgs {
    /// Run a single audit and exit.
    #[arg(long)]
    pub once: bool,

    /// Audit interval in seconds (overrides `audit_interval_secs`).
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

/// Arguments for the `add` command.
#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Title for the new task.
    pub title: String,

    /// Longer description handed to the workers.
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Scope (full, backend_only, frontend_only, doc_only, unknown).
    #[arg(long)]
    pub scope: Option<String>,

    /// Task type (FEATURE, FIX, DOC, VERIFY, EXPLORE, UNKNOWN).
    #[arg(long)]
    pub task_type: Option<String>,
}

/// Arguments for the `block` command.
#[derive(Parser, Debug)]
pub struct BlockArgs {
    /// Task ID to block.
    pub task_id: String,

    /// Reason appended to the task description (required).
    #[arg(short, long)]
    pub reason: String,
}

/// Arguments for the `reset` command.
#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Confirm that every task should be discarded.
    #[arg(long)]
    pub yes: bool,
}

/// Arguments for the `gate` command.
#[derive(Parser, Debug)]
pub struct GateArgs {
    /// Task ID to evaluate.
    pub task_id: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
