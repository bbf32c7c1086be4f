//! Gate evaluation.

use super::artifacts::{ArtifactResult, check_artifacts};
use super::runner::{CheckResult, CheckRunner};
use super::scope::filter_checks_by_scope;
use crate::policy::{GateMode, ProjectPolicy};
use crate::task::Task;
use std::path::Path;

/// Outcome of gating one task.
#[derive(Debug, Clone)]
pub struct GateReport {
    /// `false` when the workspace has no usable policy; the gate then passes.
    pub policy_found: bool,
    pub gate: GateMode,
    pub checks: Vec<CheckResult>,
    pub artifacts: Vec<ArtifactResult>,
    pub passed: bool,
}

impl GateReport {
    fn skipped() -> Self {
        Self {
            policy_found: false,
            gate: GateMode::default(),
            checks: Vec::new(),
            artifacts: Vec::new(),
            passed: true,
        }
    }

    /// Failure detail for a task description: failed checks and missing artifacts.
    pub fn failure_summary(&self) -> String {
        let mut lines = Vec::new();

        for check in self.checks.iter().filter(|c| !c.passed) {
            lines.push(format!("- check `{}` failed", check.id));
            if let Some(diagnostic) = &check.diagnostic {
                lines.extend(diagnostic.lines().map(|l| format!("  {}", l)));
            }
        }
        for artifact in self.artifacts.iter().filter(|a| !a.satisfied()) {
            lines.push(format!("- required artifact `{}` is missing", artifact.path));
        }
        if lines.is_empty() && !self.passed {
            lines.push(format!("- no check passed (gate: {})", self.gate));
        }

        lines.join("\n")
    }
}

/// Decide a gate from check and artifact results.
///
/// `any` with zero checks passes on artifacts alone.
pub fn evaluate_gate(gate: GateMode, checks: &[CheckResult], artifacts: &[ArtifactResult]) -> bool {
    let artifacts_ok = artifacts.iter().all(ArtifactResult::satisfied);

    let checks_ok = match gate {
        GateMode::All => checks.iter().all(|c| c.passed),
        GateMode::Any => checks.is_empty() || checks.iter().any(|c| c.passed),
        GateMode::ArtifactsOnly => true,
    };

    checks_ok && artifacts_ok
}

/// Run the workspace policy for `task`: scope-filtered checks, artifacts, gate.
pub fn run_gate(workspace: &Path, task: &Task, runner: &CheckRunner) -> GateReport {
    let Some(policy) = ProjectPolicy::load(workspace) else {
        tracing::debug!(task = %task.id, "no project policy, gate skipped");
        return GateReport::skipped();
    };

    let dod = &policy.definition_of_done;
    let gate = policy.gate_for(task.task_type);
    let selected = filter_checks_by_scope(&dod.checks, task.scope);

    let checks = runner.run(&selected, workspace);
    let artifacts = check_artifacts(&dod.artifacts, workspace);
    let passed = evaluate_gate(gate, &checks, &artifacts);

    tracing::info!(
        task = %task.id,
        gate = %gate,
        checks = checks.len(),
        passed,
        "gate evaluated"
    );

    GateReport {
        policy_found: true,
        gate,
        checks,
        artifacts,
        passed,
    }
}
