//! Implementation of the `agency reset` command.
//!
//! Discards every task, removes a pending verdict and truncates the product
//! logs. The notification log is kept and gets a `store_reset` event.

use crate::activity::ActivityLog;
use crate::cli::ResetArgs;
use crate::context::AgencyContext;
use crate::dispatcher::verdict::clear_verdict;
use crate::error::{AgencyError, Result};
use crate::events::{Event, EventAction, EventLog, Notifier};
use crate::task::TaskStore;
use crate::watchdog::PidRecord;
use crate::worker::Role;
use serde_json::json;

pub fn cmd_reset(ctx: &AgencyContext, args: ResetArgs) -> Result<()> {
    if !args.yes {
        return Err(AgencyError::UserError(
            "refusing to discard all tasks without --yes".to_string(),
        ));
    }

    if let Some(record) = PidRecord::read(&ctx.pid_path()) {
        eprintln!(
            "warning: a dispatcher (pid {}) may still be running; it will see an empty store on its next pass",
            record.pid
        );
    }

    let discarded = reset_home(ctx)?;
    println!("Reset {}: {} task(s) discarded.", ctx.home.display(), discarded);
    Ok(())
}

/// Returns how many tasks were discarded.
pub(crate) fn reset_home(ctx: &AgencyContext) -> Result<usize> {
    let config = super::load_config(ctx)?;
    ctx.ensure_dirs()?;

    let store = TaskStore::new(ctx.tasks_path());
    let discarded = store.load().map(|list| list.tasks.len()).unwrap_or(0);
    store.reset()?;

    clear_verdict(&ctx.workspace_path(&config.workspace).join(&config.verdict_file));

    let logs = [ctx.activity_log_path(), ctx.watchdog_log_path()]
        .into_iter()
        .chain(Role::ALL.iter().map(|role| ctx.role_log_path(role.as_str())));
    for path in logs {
        ActivityLog::new(path).truncate()?;
    }

    EventLog::new(ctx.notifications_path()).notify(
        Event::new(EventAction::StoreReset, super::COMPONENT)
            .with_details(json!({ "discarded": discarded })),
    );

    Ok(discarded)
}
