//! Implementation of the `agency status` command.
//!
//! Prints task counts per status, then one line per task.

use crate::context::AgencyContext;
use crate::error::Result;
use crate::events::EventLog;
use crate::task::{TaskList, TaskStatus, TaskStore};
use crate::watchdog::{PidRecord, WorkerRecord};

const RECENT_EVENTS: usize = 5;

pub fn cmd_status(ctx: &AgencyContext) -> Result<()> {
    let store = TaskStore::new(ctx.tasks_path());
    let list = store.load();
    if list.is_none() && store.path().exists() {
        eprintln!("warning: task store '{}' is unreadable", store.path().display());
    }

    print!("{}", render_status(&list.unwrap_or_default()));

    println!();
    match PidRecord::read(&ctx.pid_path()) {
        Some(record) => println!(
            "Dispatcher: pid {} (started {} by {})",
            record.pid,
            record.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.owner
        ),
        None => println!("Dispatcher: no pid record"),
    }
    if let Some(worker) = WorkerRecord::read(&ctx.worker_pid_path()) {
        println!(
            "Worker:     {} on {} (pgid {}, started {})",
            worker.role,
            worker.task_id,
            worker.pgid,
            worker.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if ctx.stop_flag_path().exists() {
        println!("Watchdog:   paused");
    }

    let events = EventLog::new(ctx.notifications_path()).read_all();
    if !events.is_empty() {
        println!();
        println!("Recent events:");
        for event in &events[events.len().saturating_sub(RECENT_EVENTS)..] {
            println!(
                "  {} {:22} {:10} {}",
                event.ts.format("%Y-%m-%d %H:%M:%S"),
                event.action.to_string(),
                event.task.as_deref().unwrap_or("-"),
                event.actor
            );
        }
    }
    Ok(())
}

pub(crate) fn render_status(list: &TaskList) -> String {
    let mut out = String::new();
    out.push_str("Agency Status\n");
    out.push_str("=============\n\n");

    out.push_str("Tasks:\n");
    for status in TaskStatus::ALL {
        out.push_str(&format!("  {:14} {:>3}\n", status.as_str(), list.count(status)));
    }
    out.push_str("  --------------\n");
    out.push_str(&format!("  {:14} {:>3}\n", "total", list.tasks.len()));

    if !list.tasks.is_empty() {
        out.push('\n');
        for task in &list.tasks {
            let retries = if task.retry_count > 0 {
                format!(" retries={}", task.retry_count)
            } else {
                String::new()
            };
            out.push_str(&format!(
                "  {:10} {:14} [{}/{}]{} {}\n",
                task.id, task.status.as_str(), task.task_type, task.scope, retries, task.title
            ));
        }
    }

    out
}
