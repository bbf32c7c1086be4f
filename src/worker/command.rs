//! Worker executor that spawns the configured command line.
//!
//! The command runs in its own process group so a timeout kills the agent
//! together with anything it started. Output goes to the role's log file.
//! While waiting, the liveness log is touched periodically so the watchdog
//! does not mistake a long invocation for a stall. The live group is recorded
//! so the watchdog can kill it along with the dispatcher.

use super::supervise::{isolate, wait_with_timeout};
use super::template::{TemplateError, render_command};
use super::{Invocation, Worker, WorkerOutcome};
use crate::activity::ActivityLog;
use crate::watchdog::WorkerRecord;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Spawns `agent_command` for every invocation.
#[derive(Debug, Clone)]
pub struct CommandWorker {
    command_template: String,
    timeout: Duration,
    logs_dir: PathBuf,
    heartbeat: Option<ActivityLog>,
    record_path: Option<PathBuf>,
    environment: HashMap<String, String>,
}

impl CommandWorker {
    pub fn new(command_template: impl Into<String>, timeout: Duration, logs_dir: PathBuf) -> Self {
        Self {
            command_template: command_template.into(),
            timeout,
            logs_dir,
            heartbeat: None,
            record_path: None,
            environment: HashMap::new(),
        }
    }

    /// Touch `log` while waiting on a worker.
    pub fn with_heartbeat(mut self, log: ActivityLog) -> Self {
        self.heartbeat = Some(log);
        self
    }

    /// Record the live worker's process group at `path` while it runs.
    pub fn with_worker_record(mut self, path: PathBuf) -> Self {
        self.record_path = Some(path);
        self
    }

    /// Extra environment variable passed to every worker.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    fn build_args(&self, invocation: &Invocation) -> Result<Vec<String>, String> {
        let workdir = invocation.workdir.to_string_lossy().to_string();
        let variables = HashMap::from([
            ("role", invocation.role.as_str().to_string()),
            ("task_id", invocation.task_id.clone()),
            ("prompt", invocation.prompt.clone()),
            ("workdir", workdir),
        ]);

        let args = render_command(&self.command_template, &variables).map_err(|e| match e {
            TemplateError::UndefinedVariable { name, .. } => format!(
                "agent command template references undefined variable '{}' (available: prompt, role, task_id, workdir)",
                name
            ),
            other => format!("invalid agent command template: {}", other),
        })?;

        if args.is_empty() {
            return Err(format!(
                "agent command is empty after parsing: '{}'",
                self.command_template
            ));
        }
        Ok(args)
    }

    fn spawn(&self, invocation: &Invocation, log_path: &Path) -> Result<Child, String> {
        let args = self.build_args(invocation)?;

        std::fs::create_dir_all(&self.logs_dir).map_err(|e| {
            format!(
                "failed to create worker logs directory '{}': {}",
                self.logs_dir.display(),
                e
            )
        })?;
        let stdout = File::create(log_path)
            .map_err(|e| format!("failed to create worker log '{}': {}", log_path.display(), e))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| format!("failed to share worker log handle: {}", e))?;

        let mut command = Command::new(&args[0]);
        command
            .args(&args[1..])
            .current_dir(&invocation.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .env("AGENCY_ROLE", invocation.role.as_str())
            .env("AGENCY_TASK_ID", &invocation.task_id)
            .envs(&self.environment);

        isolate(&mut command);

        command.spawn().map_err(|e| {
            format!(
                "failed to execute agent command '{}': {}. Ensure it is installed and in PATH.",
                args[0], e
            )
        })
    }
}

impl Worker for CommandWorker {
    fn invoke(&mut self, invocation: &Invocation) -> WorkerOutcome {
        let log_path = self.logs_dir.join(format!("{}.log", invocation.role));
        let start = Instant::now();

        let mut child = match self.spawn(invocation, &log_path) {
            Ok(child) => child,
            Err(error) => {
                tracing::warn!(role = %invocation.role, task = %invocation.task_id, %error, "worker failed to start");
                return WorkerOutcome::failed_to_start(error);
            }
        };

        tracing::info!(
            role = %invocation.role,
            task = %invocation.task_id,
            pid = child.id(),
            "worker started"
        );

        if let Some(path) = &self.record_path
            && let Err(e) =
                WorkerRecord::new(child.id(), invocation.role, &invocation.task_id).write(path)
        {
            tracing::warn!(error = %e, "failed to record worker process group");
        }

        let waited = wait_with_timeout(&mut child, self.timeout, self.heartbeat.as_ref());

        if let Some(path) = &self.record_path {
            WorkerRecord::remove(path);
        }

        WorkerOutcome {
            exit_code: waited.exit_code,
            timed_out: waited.timed_out,
            error: None,
            log_path: Some(log_path),
            duration: start.elapsed(),
        }
    }
}
