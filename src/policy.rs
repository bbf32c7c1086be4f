//! Per-project Definition of Done policy.
//!
//! The policy lives in the workspace at `.agency/agency.json`:
//!
//! ```text
//! {
//!   "definitionOfDone": {
//!     "artifacts": ["dist/index.html", { "path": "coverage/**", "optional": true }],
//!     "checks": [{ "id": "backend-test", "command": "npm test", "cwd": "backend" }],
//!     "gate": "all"
//!   },
//!   "taskPolicies": { "DOC": { "gate": "none" } }
//! }
//! ```
//!
//! Loading is fail-soft. A missing file, malformed JSON, or a
//! `definitionOfDone` without a `checks` array all mean "no policy", and the
//! gatekeeper then passes every task.

use crate::task::TaskType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Policy file location relative to the workspace.
pub const POLICY_FILE: &str = ".agency/agency.json";

/// How check results combine into a gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Every check passes and required artifacts are present.
    #[default]
    All,
    /// At least one check passes and required artifacts are present.
    Any,
    /// Only required artifacts matter.
    #[serde(rename = "none")]
    ArtifactsOnly,
}

impl GateMode {
    /// Lenient parse: anything unrecognised is `All`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Self::Any,
            "none" => Self::ArtifactsOnly,
            _ => Self::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
            Self::ArtifactsOnly => "none",
        }
    }
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One verification command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSpec {
    #[serde(default)]
    pub id: String,

    /// Command line (shell-words parsed; no shell).
    pub command: String,

    /// Directory relative to the workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    /// Free-form scope tag (`frontend`, `backend`, `doc`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl CheckSpec {
    pub fn new(id: &str, command: &str) -> Self {
        Self {
            id: id.to_string(),
            command: command.to_string(),
            cwd: None,
            scope: None,
        }
    }

    /// Name used in reports: the id, or the command when the id is empty.
    pub fn label(&self) -> &str {
        if self.id.is_empty() {
            &self.command
        } else {
            &self.id
        }
    }
}

/// A file or glob that must (or may) exist in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSpec {
    pub path: String,
    pub optional: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawArtifact {
    Path(String),
    Entry {
        path: String,
        #[serde(default)]
        optional: bool,
    },
}

impl From<RawArtifact> for ArtifactSpec {
    fn from(raw: RawArtifact) -> Self {
        match raw {
            RawArtifact::Path(path) => Self {
                path,
                optional: false,
            },
            RawArtifact::Entry { path, optional } => Self { path, optional },
        }
    }
}

/// The `definitionOfDone` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionOfDone {
    pub artifacts: Vec<ArtifactSpec>,
    pub checks: Vec<CheckSpec>,
    pub gate: GateMode,
}

/// Loaded project policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPolicy {
    pub definition_of_done: DefinitionOfDone,
    /// Gate overrides keyed by task type.
    pub task_policies: BTreeMap<TaskType, GateMode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPolicyFile {
    definition_of_done: Option<RawDefinitionOfDone>,
    #[serde(default)]
    task_policies: BTreeMap<String, RawTaskPolicy>,
}

#[derive(Deserialize)]
struct RawDefinitionOfDone {
    #[serde(default)]
    artifacts: serde_json::Value,
    #[serde(default)]
    checks: serde_json::Value,
    #[serde(default)]
    gate: Option<String>,
}

#[derive(Deserialize)]
struct RawTaskPolicy {
    #[serde(default)]
    gate: Option<String>,
}

impl ProjectPolicy {
    pub fn path_in(workspace: &Path) -> PathBuf {
        workspace.join(POLICY_FILE)
    }

    /// Load the policy for `workspace`, or `None` when there is no usable policy.
    pub fn load(workspace: &Path) -> Option<Self> {
        let path = Self::path_in(workspace);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read project policy");
                return None;
            }
        };

        let policy = Self::from_json(&content);
        if policy.is_none() {
            tracing::warn!(path = %path.display(), "ignoring unusable project policy");
        }
        policy
    }

    /// Parse a policy document. See [`ProjectPolicy::load`] for the leniency rules.
    pub fn from_json(content: &str) -> Option<Self> {
        let raw: RawPolicyFile = serde_json::from_str(content).ok()?;
        let dod = raw.definition_of_done?;

        let checks: Vec<CheckSpec> = match dod.checks {
            serde_json::Value::Array(_) => serde_json::from_value(dod.checks).ok()?,
            _ => return None,
        };

        let artifacts = match dod.artifacts {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<RawArtifact>(item).ok())
                .map(ArtifactSpec::from)
                .collect(),
            _ => Vec::new(),
        };

        let gate = dod
            .gate
            .as_deref()
            .map(GateMode::parse_lenient)
            .unwrap_or_default();

        let task_policies = raw
            .task_policies
            .into_iter()
            .filter_map(|(name, policy)| {
                let task_type = TaskType::from_str(&name)?;
                let gate = policy.gate.as_deref()?;
                Some((task_type, GateMode::parse_lenient(gate)))
            })
            .collect();

        Some(Self {
            definition_of_done: DefinitionOfDone {
                artifacts,
                checks,
                gate,
            },
            task_policies,
        })
    }

    /// Gate mode for a task type, honoring `taskPolicies` overrides.
    pub fn gate_for(&self, task_type: TaskType) -> GateMode {
        self.task_policies
            .get(&task_type)
            .copied()
            .unwrap_or(self.definition_of_done.gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_full_policy() {
        let json = r#"{
            "definitionOfDone": {
                "artifacts": ["dist/index.html", { "path": "coverage/**", "optional": true }],
                "checks": [
                    { "id": "backend-test", "command": "npm test", "cwd": "backend" },
                    { "id": "docs", "command": "mdlint", "scope": "doc" }
                ],
                "gate": "any"
            },
            "taskPolicies": { "DOC": { "gate": "none" } }
        }"#;

        let policy = ProjectPolicy::from_json(json).unwrap();
        let dod = &policy.definition_of_done;

        assert_eq!(dod.gate, GateMode::Any);
        assert_eq!(dod.checks.len(), 2);
        assert_eq!(dod.checks[0].cwd.as_deref(), Some("backend"));
        assert_eq!(dod.checks[1].scope.as_deref(), Some("doc"));
        assert_eq!(
            dod.artifacts,
            vec![
                ArtifactSpec {
                    path: "dist/index.html".to_string(),
                    optional: false
                },
                ArtifactSpec {
                    path: "coverage/**".to_string(),
                    optional: true
                },
            ]
        );
        assert_eq!(policy.gate_for(TaskType::Doc), GateMode::ArtifactsOnly);
        assert_eq!(policy.gate_for(TaskType::Feature), GateMode::Any);
    }

    #[test]
    fn unknown_gate_falls_back_to_all() {
        let json = r#"{ "definitionOfDone": { "checks": [], "gate": "most" } }"#;

        let policy = ProjectPolicy::from_json(json).unwrap();

        assert_eq!(policy.definition_of_done.gate, GateMode::All);
    }

    #[test]
    fn missing_gate_defaults_to_all() {
        let json = r#"{ "definitionOfDone": { "checks": [] } }"#;

        assert_eq!(
            ProjectPolicy::from_json(json).unwrap().definition_of_done.gate,
            GateMode::All
        );
    }

    #[test]
    fn checks_must_be_an_array() {
        assert!(ProjectPolicy::from_json(r#"{ "definitionOfDone": { "checks": "npm test" } }"#).is_none());
        assert!(ProjectPolicy::from_json(r#"{ "definitionOfDone": { "gate": "all" } }"#).is_none());
        assert!(ProjectPolicy::from_json(r#"{ "taskPolicies": {} }"#).is_none());
    }

    #[test]
    fn malformed_json_is_none() {
        assert!(ProjectPolicy::from_json("{ definitionOfDone: ").is_none());
    }

    #[test]
    fn non_array_artifacts_are_ignored() {
        let json = r#"{ "definitionOfDone": { "checks": [], "artifacts": "dist" } }"#;

        assert!(ProjectPolicy::from_json(json).unwrap().definition_of_done.artifacts.is_empty());
    }

    #[test]
    fn unknown_task_types_in_overrides_are_skipped() {
        let json = r#"{
            "definitionOfDone": { "checks": [] },
            "taskPolicies": { "CHORE": { "gate": "none" }, "fix": { "gate": "any" } }
        }"#;

        let policy = ProjectPolicy::from_json(json).unwrap();

        assert_eq!(policy.task_policies.len(), 1);
        assert_eq!(policy.gate_for(TaskType::Fix), GateMode::Any);
    }

    #[test]
    fn load_reads_workspace_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ProjectPolicy::load(temp_dir.path()).is_none());

        let path = ProjectPolicy::path_in(temp_dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{ "definitionOfDone": { "checks": [{ "id": "lint", "command": "npm run lint" }] } }"#,
        )
        .unwrap();

        let policy = ProjectPolicy::load(temp_dir.path()).unwrap();
        assert_eq!(policy.definition_of_done.checks[0].label(), "lint");
    }

    #[test]
    fn label_falls_back_to_command() {
        let check = CheckSpec::new("", "npm test");

        assert_eq!(check.label(), "npm test");
    }
}
