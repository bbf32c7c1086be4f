//! Dispatcher process control: pid records, termination and relaunch.

use crate::error::{AgencyError, Result};
use crate::fs::atomic_write_file;
use crate::worker::Role;
use crate::worker::supervise::{kill_group, kill_pid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Written by `agency dispatch` on start; read by the watchdog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidRecord {
    pub pid: u32,

    /// `user@HOST` that started the dispatcher.
    pub owner: String,

    pub started_at: DateTime<Utc>,
}

impl PidRecord {
    /// Record for the current process.
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            owner: owner_string(),
            started_at: Utc::now(),
        }
    }

    /// Read a record; a missing or unparseable file yields `None`.
    pub fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable pid record");
                None
            }
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            AgencyError::ProcessError(format!("failed to serialize pid record: {}", e))
        })?;
        atomic_write_file(path, &format!("{}\n", json))
    }
}

/// Written by the dispatcher while a worker runs; removed when it exits.
///
/// The worker leads its own process group, so `pgid` is also its pid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub pgid: u32,
    pub role: Role,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
}

impl WorkerRecord {
    pub fn new(pgid: u32, role: Role, task_id: impl Into<String>) -> Self {
        Self {
            pgid,
            role,
            task_id: task_id.into(),
            started_at: Utc::now(),
        }
    }

    /// Read a record; a missing or unparseable file yields `None`.
    pub fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable worker record");
                None
            }
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            AgencyError::ProcessError(format!("failed to serialize worker record: {}", e))
        })?;
        atomic_write_file(path, &format!("{}\n", json))
    }

    pub fn remove(path: &Path) {
        if let Err(e) = fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove worker record");
        }
    }
}

fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// How the watchdog stops and starts the dispatcher.
pub trait ProcessControl {
    /// Kill the running dispatcher and its live worker group.
    /// Returns the dispatcher pid that was signalled, if any.
    fn terminate(&mut self) -> Result<Option<u32>>;

    /// Start a fresh detached dispatcher. Returns its pid.
    fn relaunch(&mut self) -> Result<u32>;
}

/// OS-level control using the pid record and the current executable.
#[derive(Debug, Clone)]
pub struct SystemProcessControl {
    pid_path: PathBuf,
    worker_path: PathBuf,
    home: PathBuf,
    exe: PathBuf,
}

impl SystemProcessControl {
    pub fn new(pid_path: PathBuf, worker_path: PathBuf, home: PathBuf) -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            AgencyError::ProcessError(format!("failed to locate current executable: {}", e))
        })?;
        Ok(Self {
            pid_path,
            worker_path,
            home,
            exe,
        })
    }

    fn terminate_worker(&self) {
        let Some(record) = WorkerRecord::read(&self.worker_path) else {
            return;
        };
        match kill_group(record.pgid) {
            Ok(()) => tracing::info!(
                pgid = record.pgid,
                role = %record.role,
                task = %record.task_id,
                "killed orphaned worker group"
            ),
            Err(e) => tracing::debug!(pgid = record.pgid, error = %e, "worker group already gone"),
        }
        WorkerRecord::remove(&self.worker_path);
    }
}

impl ProcessControl for SystemProcessControl {
    fn terminate(&mut self) -> Result<Option<u32>> {
        let Some(record) = PidRecord::read(&self.pid_path) else {
            tracing::info!("no dispatcher pid record, nothing to terminate");
            self.terminate_worker();
            return Ok(None);
        };
        if record.pid == std::process::id() {
            return Err(AgencyError::ProcessError(
                "pid record points at the watchdog itself".to_string(),
            ));
        }

        // Dispatcher first so it cannot start another worker.
        if let Err(e) = kill_pid(record.pid) {
            tracing::warn!(pid = record.pid, error = %e, "kill failed");
        }
        let _ = fs::remove_file(&self.pid_path);
        self.terminate_worker();
        Ok(Some(record.pid))
    }

    fn relaunch(&mut self) -> Result<u32> {
        let mut cmd = Command::new(&self.exe);
        cmd.arg("--home")
            .arg(&self.home)
            .arg("dispatch")
            .current_dir(&self.home)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| {
            AgencyError::ProcessError(format!(
                "failed to relaunch dispatcher '{}': {}",
                self.exe.display(),
                e
            ))
        })?;
        let pid = child.id();

        // Reap the child if it exits while the watchdog is still running.
        std::thread::spawn(move || {
            let _ = child.wait();
        });

        Ok(pid)
    }
}
