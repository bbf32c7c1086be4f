//! Check command execution.
//!
//! Each check runs as a plain process (shell-words parsed, no shell) in
//! `workspace/<cwd>`, in its own process group and under a wall-clock limit.
//! A failing check carries a bounded diagnostic taken from the tail of
//! stderr, or of stdout when stderr is empty.

use crate::activity::ActivityLog;
use crate::policy::CheckSpec;
use crate::worker::supervise::{drain, isolate, kill_group, wait_with_timeout};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Maximum number of diagnostic lines kept per failed check.
pub const DIAGNOSTIC_MAX_LINES: usize = 20;

/// Maximum total characters kept per failed check.
pub const DIAGNOSTIC_MAX_CHARS: usize = 2000;

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub id: String,
    pub passed: bool,
    pub diagnostic: Option<String>,
}

impl CheckResult {
    pub fn pass(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            passed: true,
            diagnostic: None,
        }
    }

    pub fn fail(id: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            passed: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Runs check commands with a per-check timeout.
#[derive(Debug, Clone)]
pub struct CheckRunner {
    timeout: Duration,
    heartbeat: Option<ActivityLog>,
}

impl CheckRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            heartbeat: None,
        }
    }

    /// Touch `log` while a check is running.
    pub fn with_heartbeat(mut self, log: ActivityLog) -> Self {
        self.heartbeat = Some(log);
        self
    }

    /// Run `checks` in order against `workspace`.
    pub fn run(&self, checks: &[CheckSpec], workspace: &Path) -> Vec<CheckResult> {
        checks
            .iter()
            .map(|check| {
                let result = self.run_check(check, workspace);
                tracing::debug!(check = check.label(), passed = result.passed, "check finished");
                result
            })
            .collect()
    }

    fn run_check(&self, check: &CheckSpec, workspace: &Path) -> CheckResult {
        let label = check.label();
        let command = check.command.trim();
        if command.is_empty() {
            return CheckResult::fail(label, "command is empty");
        }

        let args = match shell_words::split(command) {
            Ok(args) => args,
            Err(e) => {
                return CheckResult::fail(
                    label,
                    format!("failed to parse command: {}\nCommand: {}", e, command),
                );
            }
        };

        let Some((program, cmd_args)) = args.split_first() else {
            return CheckResult::fail(
                label,
                format!("command is empty after parsing.\nCommand: {}", command),
            );
        };

        let dir = match check.cwd.as_deref() {
            Some(cwd) if !cwd.trim().is_empty() => workspace.join(cwd),
            _ => workspace.to_path_buf(),
        };

        let mut process = Command::new(program);
        process
            .args(cmd_args)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate(&mut process);

        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(e) => {
                return CheckResult::fail(
                    label,
                    format!(
                        "failed to execute command: {}\nCommand: {}\nDirectory: {}",
                        e,
                        command,
                        dir.display()
                    ),
                );
            }
        };

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let waited = wait_with_timeout(&mut child, self.timeout, self.heartbeat.as_ref());
        // Background processes left in the group would keep the pipes open.
        let _ = kill_group(child.id());
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if waited.exit_code == Some(0) {
            return CheckResult::pass(label);
        }

        let stderr = String::from_utf8_lossy(&stderr);
        let stdout = String::from_utf8_lossy(&stdout);
        let source = if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        };

        let mut diagnostic = if waited.timed_out {
            tracing::warn!(check = label, timeout = ?self.timeout, "check timed out");
            format!("timed out after {:?}", self.timeout)
        } else {
            let exit = waited
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            format!("exit code {}", exit)
        };
        let tail = truncate_output(&source, DIAGNOSTIC_MAX_LINES, DIAGNOSTIC_MAX_CHARS);
        if !tail.is_empty() {
            diagnostic.push('\n');
            diagnostic.push_str(&tail);
        }

        CheckResult::fail(label, diagnostic)
    }
}

/// Keep the last `max_lines` lines, then the last `max_chars` characters.
pub(crate) fn truncate_output(output: &str, max_lines: usize, max_chars: usize) -> String {
    let lines: Vec<&str> = output.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    let result = lines[start..].join("\n");

    let char_count = result.chars().count();
    if char_count <= max_chars {
        return result;
    }

    let tail: String = result.chars().skip(char_count - max_chars).collect();
    format!("...(truncated)...\n{}", tail)
}
