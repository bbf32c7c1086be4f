//! Implementation of the `agency gate` command.
//!
//! Runs the same definition-of-done evaluation the dispatcher runs before
//! the tester, without touching the task store.

use crate::checks::{CheckRunner, GateReport, run_gate};
use crate::cli::GateArgs;
use crate::context::AgencyContext;
use crate::error::{AgencyError, Result};
use crate::policy::ProjectPolicy;
use crate::task::{Task, TaskStore};

/// # Exit Codes
///
/// - 0: gate passed (or no policy)
/// - 1: task or store missing
/// - 6: gate failed
pub fn cmd_gate(ctx: &AgencyContext, args: GateArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    let workspace = super::require_workspace(ctx, &config)?;

    let store = TaskStore::new(ctx.tasks_path());
    let task = find_task(&store, &args.task_id)?;

    let report = run_gate(&workspace, &task, &CheckRunner::new(config.check_timeout()));
    print!("{}", render_report(&task, &report));
    if !report.policy_found {
        println!(
            "(no policy at {})",
            ProjectPolicy::path_in(&workspace).display()
        );
    }

    if report.passed {
        Ok(())
    } else {
        Err(AgencyError::GateFailed(format!(
            "{} did not meet its definition of done",
            task.id
        )))
    }
}

fn find_task(store: &TaskStore, task_id: &str) -> Result<Task> {
    let list = store.load().ok_or_else(|| {
        AgencyError::UserError(format!(
            "no readable task store at '{}'",
            store.path().display()
        ))
    })?;
    list.find(task_id).cloned().ok_or_else(|| {
        AgencyError::UserError(format!("task '{}' not found", task_id))
    })
}

pub(crate) fn render_report(task: &Task, report: &GateReport) -> String {
    let mut out = format!(
        "Gate for {} [{}/{}], mode: {}\n",
        task.id, task.task_type, task.scope, report.gate
    );

    if !report.checks.is_empty() {
        out.push_str("\nChecks:\n");
        for check in &report.checks {
            let status = if check.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!("  {}: {}\n", check.id, status));
            if let Some(diagnostic) = check.diagnostic.as_ref().filter(|_| !check.passed) {
                for line in diagnostic.lines() {
                    out.push_str(&format!("      {}\n", line));
                }
            }
        }
    }

    if !report.artifacts.is_empty() {
        out.push_str("\nArtifacts:\n");
        for artifact in &report.artifacts {
            let status = match (artifact.present, artifact.optional) {
                (true, _) => "present",
                (false, true) => "missing (optional)",
                (false, false) => "MISSING",
            };
            out.push_str(&format!("  {}: {}\n", artifact.path, status));
        }
    }

    out.push('\n');
    out.push_str(if report.passed {
        "Gate passed.\n"
    } else {
        "Gate failed.\n"
    });
    out
}
