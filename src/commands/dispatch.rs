//! Implementation of the `agency dispatch` command.
//!
//! Writes the pid record the watchdog uses, then loops: run passes until
//! idle, refresh the liveness log, sleep, reload `agency.yaml`.

use crate::activity::ActivityLog;
use crate::checks::CheckRunner;
use crate::cli::DispatchArgs;
use crate::config::Config;
use crate::context::AgencyContext;
use crate::dispatcher::{Dispatcher, PolicyGatekeeper};
use crate::error::Result;
use crate::events::EventLog;
use crate::task::TaskStore;
use crate::watchdog::PidRecord;
use crate::worker::CommandWorker;
use std::thread;
use std::time::Duration;

/// Environment variable pointing workers at the agency home.
pub const HOME_ENV: &str = "AGENCY_HOME";

pub fn cmd_dispatch(ctx: &AgencyContext, args: DispatchArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    let workspace = super::require_workspace(ctx, &config)?;
    ctx.ensure_dirs()?;

    PidRecord::current().write(&ctx.pid_path())?;

    let activity = ActivityLog::new(ctx.activity_log_path());
    let worker = CommandWorker::new(
        config.agent_command.clone(),
        config.worker_timeout(),
        ctx.logs_dir.clone(),
    )
    .with_heartbeat(activity.clone())
    .with_worker_record(ctx.worker_pid_path())
    .with_env(HOME_ENV, ctx.home.to_string_lossy());
    let gatekeeper = PolicyGatekeeper::new(
        CheckRunner::new(config.check_timeout()).with_heartbeat(activity.clone()),
    );

    let mut dispatcher = Dispatcher::new(
        TaskStore::new(ctx.tasks_path()),
        activity.clone(),
        workspace.clone(),
        config.clone(),
        worker,
        gatekeeper,
        EventLog::new(ctx.notifications_path()),
    );
    dispatcher.prime();

    let interval = |config: &Config| match args.interval_ms {
        Some(ms) => Duration::from_millis(ms.max(50)),
        None => config.dispatch_interval().max(Duration::from_millis(50)),
    };

    eprintln!("agency dispatch started");
    eprintln!("  home:      {}", ctx.home.display());
    eprintln!("  workspace: {}", workspace.display());
    eprintln!("  interval:  {}ms", interval(&config).as_millis());
    eprintln!();

    if let Err(e) = activity.append(&format!("START pid={}", std::process::id())) {
        tracing::warn!(error = %e, "failed to write activity log");
    }

    let mut config = config;
    loop {
        let invocations = dispatcher.run_pass()?;
        if invocations > 0 {
            tracing::info!(invocations, "dispatch pass finished");
        }

        if args.once {
            break;
        }

        // Idle is not a stall.
        if let Err(e) = activity.touch() {
            tracing::warn!(error = %e, "failed to refresh activity log");
        }
        thread::sleep(interval(&config));

        match Config::load_or_default(ctx.config_path()) {
            Ok(fresh) => {
                config = fresh.clone();
                dispatcher.set_config(fresh);
            }
            Err(e) => tracing::warn!(error = %e, "keeping previous config"),
        }
    }

    Ok(())
}
