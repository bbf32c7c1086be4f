//! Implementation of the `agency block` command.

use crate::cli::BlockArgs;
use crate::context::AgencyContext;
use crate::error::{AgencyError, Result};
use crate::events::{Event, EventAction, EventLog, Notifier};
use crate::task::TaskStore;
use serde_json::json;

pub fn cmd_block(ctx: &AgencyContext, args: BlockArgs) -> Result<()> {
    if block_task(ctx, &args)? {
        println!("Blocked {}.", args.task_id);
    } else {
        println!("{} is already completed or blocked.", args.task_id);
    }
    Ok(())
}

/// Returns `false` when the task was already completed or blocked.
pub(crate) fn block_task(ctx: &AgencyContext, args: &BlockArgs) -> Result<bool> {
    let reason = args.reason.trim();
    if reason.is_empty() {
        return Err(AgencyError::UserError("block reason must not be empty".to_string()));
    }

    let store = TaskStore::new(ctx.tasks_path());
    let list = store.load().ok_or_else(|| {
        AgencyError::UserError(format!(
            "no readable task store at '{}'",
            store.path().display()
        ))
    })?;
    if list.find(&args.task_id).is_none() {
        return Err(AgencyError::UserError(format!(
            "task '{}' not found",
            args.task_id
        )));
    }

    let blocked = store.force_block(&args.task_id, reason)?;
    if blocked {
        EventLog::new(ctx.notifications_path()).notify(
            Event::new(EventAction::TaskBlocked, super::COMPONENT)
                .with_task(&args.task_id)
                .with_details(json!({ "reason": reason })),
        );
    }
    Ok(blocked)
}
