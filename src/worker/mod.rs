//! Worker invocation.
//!
//! A worker is an external agent process invoked with a role and a prompt.
//! The dispatcher only sees the [`Worker`] trait; [`CommandWorker`] is the
//! production implementation that spawns the configured command line.

mod command;
pub mod supervise;
pub mod template;

pub use command::CommandWorker;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The three worker roles of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Refines a pending task and moves it to in_progress.
    Planner,
    /// Implements the task in the workspace.
    Developer,
    /// Verifies the implementation and writes the verdict artifact.
    Tester,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Planner, Role::Developer, Role::Tester];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Developer => "developer",
            Self::Tester => "tester",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to run a worker. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub role: Role,
    pub task_id: String,
    pub prompt: String,
    pub workdir: PathBuf,
}

/// Result of one worker invocation.
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    /// Exit code of the process (`None` if it never ran, was killed, or died by signal).
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Set when the process could not be started at all.
    pub error: Option<String>,
    /// Captured stdout and stderr.
    pub log_path: Option<PathBuf>,
    pub duration: Duration,
}

impl WorkerOutcome {
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.error.is_none() && self.exit_code == Some(0)
    }

    /// An outcome for an invocation that never started.
    pub fn failed_to_start(error: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            timed_out: false,
            error: Some(error.into()),
            log_path: None,
            duration: Duration::ZERO,
        }
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        if let Some(error) = &self.error {
            return format!("failed to start: {}", error);
        }
        if self.timed_out {
            return format!("timed out after {}s", self.duration.as_secs());
        }
        match self.exit_code {
            Some(0) => "succeeded".to_string(),
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs worker invocations to completion.
///
/// Failures of any kind are reported through [`WorkerOutcome`]; an invocation
/// never aborts the caller.
pub trait Worker {
    fn invoke(&mut self, invocation: &Invocation) -> WorkerOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(exit_code: Option<i32>, timed_out: bool) -> WorkerOutcome {
        WorkerOutcome {
            exit_code,
            timed_out,
            error: None,
            log_path: None,
            duration: Duration::from_secs(3),
        }
    }

    #[test]
    fn success_requires_clean_zero_exit() {
        assert!(outcome(Some(0), false).is_success());
        assert!(!outcome(Some(1), false).is_success());
        assert!(!outcome(Some(0), true).is_success());
        assert!(!outcome(None, false).is_success());
        assert!(!WorkerOutcome::failed_to_start("no such file").is_success());
    }

    #[test]
    fn describe_outcomes() {
        assert_eq!(outcome(Some(0), false).describe(), "succeeded");
        assert_eq!(outcome(Some(2), false).describe(), "exited with code 2");
        assert_eq!(outcome(None, true).describe(), "timed out after 3s");
        assert_eq!(
            WorkerOutcome::failed_to_start("not found").describe(),
            "failed to start: not found"
        );
    }

    #[test]
    fn role_serializes_as_its_name() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            assert_eq!(serde_json::from_str::<Role>(&json).unwrap(), role);
        }
        assert!(serde_json::from_str::<Role>("\"project-manager\"").is_err());
    }
}
