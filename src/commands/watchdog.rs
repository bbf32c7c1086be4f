//! Implementation of the `agency watchdog` command.
//!
//! Audits on a fixed interval until the stop flag appears. A failed heal is
//! logged and retried on the next audit; with `--once` it is returned.

use crate::activity::ActivityLog;
use crate::cli::WatchdogArgs;
use crate::config::Config;
use crate::context::AgencyContext;
use crate::error::Result;
use crate::events::EventLog;
use crate::task::TaskStore;
use crate::watchdog::{AuditOutcome, SystemProcessControl, Watchdog};
use std::thread;
use std::time::Duration;

pub fn cmd_watchdog(ctx: &AgencyContext, args: WatchdogArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    ctx.ensure_dirs()?;

    let process =
        SystemProcessControl::new(ctx.pid_path(), ctx.worker_pid_path(), ctx.home.clone())?;
    let mut watchdog = Watchdog::new(
        TaskStore::new(ctx.tasks_path()),
        ActivityLog::new(ctx.activity_log_path()),
        ActivityLog::new(ctx.watchdog_log_path()),
        ctx.stop_flag_path(),
        config.clone(),
        process,
        EventLog::new(ctx.notifications_path()),
    );

    let interval = |config: &Config| match args.interval_secs {
        Some(secs) => Duration::from_secs(secs.max(1)),
        None => config.audit_interval(),
    };

    eprintln!("agency watchdog started");
    eprintln!("  home:     {}", ctx.home.display());
    eprintln!("  interval: {}s", interval(&config).as_secs());
    eprintln!();

    let mut config = config;
    loop {
        match watchdog.audit() {
            Ok(AuditOutcome::Stopped) => {
                eprintln!("stop flag present, watchdog exiting");
                break;
            }
            Ok(outcome) => tracing::debug!(?outcome, "audit finished"),
            Err(e) if args.once => return Err(e),
            Err(e) => tracing::error!(error = %e, "audit failed"),
        }

        if args.once {
            break;
        }
        thread::sleep(interval(&config));

        match Config::load_or_default(ctx.config_path()) {
            Ok(fresh) => {
                config = fresh.clone();
                watchdog.set_config(fresh);
            }
            Err(e) => tracing::warn!(error = %e, "keeping previous config"),
        }
    }

    Ok(())
}
