//! Local verification run before a task is handed to the tester.

use crate::checks::{CheckRunner, run_gate};
use crate::task::Task;
use std::path::Path;

/// Result of the local gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub passed: bool,
    /// Failure detail appended to the task description.
    pub detail: String,
}

impl GateDecision {
    pub fn pass() -> Self {
        Self {
            passed: true,
            detail: String::new(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }
}

pub trait Gatekeeper {
    fn check(&mut self, task: &Task, workspace: &Path) -> GateDecision;
}

/// Gatekeeper driven by the workspace's Definition of Done policy.
#[derive(Debug, Clone)]
pub struct PolicyGatekeeper {
    runner: CheckRunner,
}

impl PolicyGatekeeper {
    pub fn new(runner: CheckRunner) -> Self {
        Self { runner }
    }
}

impl Gatekeeper for PolicyGatekeeper {
    fn check(&mut self, task: &Task, workspace: &Path) -> GateDecision {
        let report = run_gate(workspace, task, &self.runner);
        if report.passed {
            GateDecision::pass()
        } else {
            GateDecision::fail(report.failure_summary())
        }
    }
}
