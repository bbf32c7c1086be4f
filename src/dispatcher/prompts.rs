//! Role prompts.

use crate::task::Task;
use crate::worker::Role;
use std::path::Path;

/// Paths a worker needs to know about.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub workspace: &'a Path,
    pub tasks_file: &'a Path,
    pub verdict_file: &'a Path,
}

/// Build the prompt for `role` working on `task`.
pub fn build_prompt(role: Role, task: &Task, ctx: PromptContext<'_>) -> String {
    match role {
        Role::Planner => format!(
            "Review task {id}: \"{title}\".\n\
             Target workspace: {workspace}\n\
             Refine the description in {tasks} with concrete implementation steps, \
             then set the status of task {id} to \"in_progress\".",
            id = task.id,
            title = task.title,
            workspace = ctx.workspace.display(),
            tasks = ctx.tasks_file.display(),
        ),
        Role::Developer => format!(
            "Implement task {id}: \"{title}\".\n\
             Target workspace: {workspace}\n\
             Instructions:\n{description}\n\n\
             Write the code in the workspace. Exit with a non-zero status if you could not finish.",
            id = task.id,
            title = task.title,
            workspace = ctx.workspace.display(),
            description = if task.description.trim().is_empty() {
                "none"
            } else {
                task.description.trim()
            },
        ),
        Role::Tester => format!(
            "Verify task {id}: \"{title}\".\n\
             Target workspace: {workspace}\n\
             Exercise the change as a user would. Then write {verdict} with PASS or FAIL \
             on the first line, followed by the reasons for a failure. \
             Do not edit {tasks}.",
            id = task.id,
            title = task.title,
            workspace = ctx.workspace.display(),
            verdict = ctx.verdict_file.display(),
            tasks = ctx.tasks_file.display(),
        ),
    }
}
