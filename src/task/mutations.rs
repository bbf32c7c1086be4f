//! Mutation helpers for task lifecycle transitions.

use super::{TASK_ID_PREFIX, Task, TaskList, TaskStatus};
use crate::error::{AgencyError, Result};

/// Marker preceding a block reason in a task description.
pub const BLOCK_MARKER: &str = "BLOCK:";

impl Task {
    /// Append a feedback section to the description.
    pub fn append_feedback(&mut self, heading: &str, detail: &str) {
        if !self.description.is_empty() && !self.description.ends_with('\n') {
            self.description.push('\n');
        }
        if !self.description.is_empty() {
            self.description.push('\n');
        }
        self.description.push_str(heading);
        let detail = detail.trim_end();
        if !detail.is_empty() {
            self.description.push('\n');
            self.description.push_str(detail);
        }
    }

    pub fn increment_retry(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    pub fn exceeds_retry_limit(&self, retry_limit: u32) -> bool {
        !self.status.is_terminal() && self.retry_count > retry_limit
    }
}

impl TaskList {
    pub fn find(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }

    /// Set the status of the task at `index`. Out-of-range indices are ignored.
    pub fn set_status(&mut self, index: usize, status: TaskStatus) {
        if let Some(task) = self.tasks.get_mut(index) {
            task.status = status;
        }
    }

    /// Block a task and append the reason to its description.
    ///
    /// Returns `false` when the task is missing or already terminal
    /// (`completed` or `blocked`).
    pub fn force_block(&mut self, task_id: &str, reason: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            return false;
        };
        if task.status.is_terminal() {
            return false;
        }
        task.status = TaskStatus::Blocked;
        task.append_feedback(&format!("{} {}", BLOCK_MARKER, reason), "");
        true
    }

    /// The id after the highest numeric `task-NNN` id in the list.
    pub fn next_id(&self) -> String {
        let highest = self
            .tasks
            .iter()
            .filter_map(|t| t.id.strip_prefix(TASK_ID_PREFIX))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{:03}", TASK_ID_PREFIX, highest + 1)
    }

    /// Append a task. Fails when the id is already taken.
    pub fn add(&mut self, task: Task) -> Result<()> {
        if self.find(&task.id).is_some() {
            return Err(AgencyError::UserError(format!(
                "task '{}' already exists",
                task.id
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Number of tasks in `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }
}
