//! Agency home resolution.
//!
//! Every command operates on one agency home: the directory that holds the
//! task store, the optional runtime config, and the `.run/` directory with
//! logs, the dispatcher pid record and the watchdog stop flag. The home is
//! `--home` when given and the current working directory otherwise.

use crate::error::{AgencyError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Runtime directory name inside the agency home.
pub const RUN_DIR: &str = ".run";

/// Task store file name inside the agency home.
pub const TASKS_FILE: &str = "tasks.json";

/// Runtime config file name inside the agency home.
pub const CONFIG_FILE: &str = "agency.yaml";

/// Resolved absolute paths for one agency home.
#[derive(Debug, Clone)]
pub struct AgencyContext {
    /// Absolute path to the agency home.
    pub home: PathBuf,

    /// `{home}/.run/`
    pub run_dir: PathBuf,

    /// `{home}/.run/logs/`, one captured log per worker role.
    pub logs_dir: PathBuf,
}

impl AgencyContext {
    /// Resolve the context from an explicit home, falling back to the current directory.
    pub fn resolve(home: Option<&Path>) -> Result<Self> {
        match home {
            Some(home) => Self::resolve_from(home),
            None => {
                let cwd = env::current_dir().map_err(|e| {
                    AgencyError::UserError(format!(
                        "failed to get current working directory: {}",
                        e
                    ))
                })?;
                Self::resolve_from(cwd)
            }
        }
    }

    /// Resolve the context rooted at `home`.
    ///
    /// Relative homes are made absolute against the current directory so the
    /// paths stay valid after a worker changes directory or the dispatcher is
    /// relaunched detached.
    pub fn resolve_from<P: AsRef<Path>>(home: P) -> Result<Self> {
        let home = home.as_ref();
        let home = if home.is_absolute() {
            home.to_path_buf()
        } else {
            env::current_dir()
                .map_err(|e| {
                    AgencyError::UserError(format!(
                        "failed to get current working directory: {}",
                        e
                    ))
                })?
                .join(home)
        };

        if home.exists() && !home.is_dir() {
            return Err(AgencyError::UserError(format!(
                "agency home '{}' is not a directory",
                home.display()
            )));
        }

        let run_dir = home.join(RUN_DIR);
        let logs_dir = run_dir.join("logs");

        Ok(Self {
            home,
            run_dir,
            logs_dir,
        })
    }

    /// Create the home and its runtime directories if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.logs_dir).map_err(|e| {
            AgencyError::UserError(format!(
                "failed to create runtime directory '{}': {}",
                self.logs_dir.display(),
                e
            ))
        })
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.home.join(TASKS_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    /// The dispatcher's liveness log.
    pub fn activity_log_path(&self) -> PathBuf {
        self.run_dir.join("agency.log")
    }

    pub fn watchdog_log_path(&self) -> PathBuf {
        self.run_dir.join("watchdog.log")
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.run_dir.join("notifications.ndjson")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.run_dir.join("dispatcher.pid")
    }

    /// Process group of the worker the dispatcher is waiting on.
    pub fn worker_pid_path(&self) -> PathBuf {
        self.run_dir.join("worker.pid")
    }

    /// Presence of this file stops the watchdog.
    pub fn stop_flag_path(&self) -> PathBuf {
        self.run_dir.join("WATCHDOG_DISABLED")
    }

    /// Captured output of the most recent invocation of `role`.
    pub fn role_log_path(&self, role: &str) -> PathBuf {
        self.logs_dir.join(format!("{}.log", role))
    }

    /// Resolve the workspace the workers modify and the checks run in.
    ///
    /// Relative workspace paths from the config are taken relative to the home.
    pub fn workspace_path(&self, configured: &str) -> PathBuf {
        let configured = Path::new(configured);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.home.join(configured)
        }
    }
}
