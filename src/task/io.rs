//! File I/O for the task store.

use super::TaskList;
use crate::error::{AgencyError, Result};
use std::path::{Path, PathBuf};

/// Handle on `<home>/tasks.json`.
///
/// There is no locking: the dispatcher is the only regular writer and the
/// watchdog writes only right after terminating it.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the task list.
    ///
    /// Returns `None` when the file is missing, unreadable or not valid JSON.
    /// Workers edit this file directly, so a half-written or hand-mangled store
    /// must never take the dispatcher down.
    pub fn load(&self) -> Option<TaskList> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read task store");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "task store is corrupt, treating as empty");
                None
            }
        }
    }

    /// Atomically overwrite the store with `list`.
    pub fn save(&self, list: &TaskList) -> Result<()> {
        let content = serde_json::to_string_pretty(list)
            .map_err(|e| AgencyError::StoreError(format!("failed to serialize tasks: {}", e)))?;
        crate::fs::atomic_write_file(&self.path, &format!("{}\n", content))
    }

    /// Force-block a task directly in the store.
    ///
    /// Returns `false` without writing when the task is missing or already blocked.
    pub fn force_block(&self, task_id: &str, reason: &str) -> Result<bool> {
        let Some(mut list) = self.load() else {
            return Ok(false);
        };
        if !list.force_block(task_id, reason) {
            return Ok(false);
        }
        self.save(&list)?;
        Ok(true)
    }

    /// Replace the store with an empty task list.
    pub fn reset(&self) -> Result<()> {
        self.save(&TaskList::default())
    }
}
