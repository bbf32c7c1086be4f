use crate::context::AgencyContext;
use crate::task::{Task, TaskList, TaskStatus, TaskStore};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// A scratch agency home with its runtime directories and a `workspace/` directory.
pub(crate) struct TestHome {
    pub dir: TempDir,
    pub ctx: AgencyContext,
}

impl TestHome {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let ctx = AgencyContext::resolve_from(dir.path()).unwrap();
        ctx.ensure_dirs().unwrap();
        std::fs::create_dir_all(dir.path().join("workspace")).unwrap();
        Self { dir, ctx }
    }

    pub(crate) fn workspace(&self) -> PathBuf {
        self.dir.path().join("workspace")
    }

    pub(crate) fn store(&self) -> TaskStore {
        TaskStore::new(self.ctx.tasks_path())
    }

    /// Write the given tasks to the store, replacing its contents.
    pub(crate) fn seed(&self, tasks: Vec<Task>) {
        self.store()
            .save(&TaskList {
                tasks,
                ..Default::default()
            })
            .unwrap();
    }

    pub(crate) fn tasks(&self) -> Vec<Task> {
        self.store().load().map(|list| list.tasks).unwrap_or_default()
    }

    /// Write the workspace DoD policy file.
    pub(crate) fn write_policy(&self, json: &str) {
        let dir = self.workspace().join(".agency");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("agency.json"), json).unwrap();
    }
}

pub(crate) fn task(id: &str, status: TaskStatus) -> Task {
    let mut task = Task::new(id, format!("Task {}", id));
    task.status = status;
    task
}
