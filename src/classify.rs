//! Task classification adapter.
//!
//! An optional external command decides a new task's type and scope. It
//! receives `{"title": ..., "description": ...}` on stdin and prints
//! `{"taskType": ..., "scope": ...}`, optionally inside a ```json fence.
//! Every failure (spawn error, non-zero exit, bad JSON, unknown values)
//! falls back to `UNKNOWN` / `full`.

use crate::task::{Scope, TaskType};
use serde::Deserialize;
use std::io::Write;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub task_type: TaskType,
    pub scope: Scope,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            task_type: TaskType::Unknown,
            scope: Scope::Full,
        }
    }
}

pub trait Classifier {
    fn classify(&mut self, title: &str, description: &str) -> Classification;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    #[serde(default)]
    task_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Parse classifier output, failing open field by field.
pub fn parse_classification(text: &str) -> Classification {
    let cleaned = strip_fence(text.trim());
    let Ok(raw) = serde_json::from_str::<RawClassification>(cleaned) else {
        tracing::debug!(output = cleaned, "unparseable classifier output");
        return Classification::default();
    };

    Classification {
        task_type: raw
            .task_type
            .as_deref()
            .and_then(TaskType::from_str)
            .unwrap_or(TaskType::Unknown),
        scope: raw
            .scope
            .as_deref()
            .and_then(Scope::from_str)
            .unwrap_or(Scope::Full),
    }
}

fn strip_fence(text: &str) -> &str {
    let text = match text.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("```json") => &text[7..],
        _ => text.strip_prefix("```").unwrap_or(text),
    };
    text.trim().strip_suffix("```").unwrap_or(text).trim()
}

/// Runs `classifier_command` (shell-words parsed; no shell).
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    command: String,
}

impl CommandClassifier {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn run(&self, title: &str, description: &str) -> Result<String, String> {
        let args = shell_words::split(&self.command)
            .map_err(|e| format!("failed to parse classifier command: {}", e))?;
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| "classifier command is empty".to_string())?;

        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("failed to execute classifier '{}': {}", program, e))?;

        let input = serde_json::json!({ "title": title, "description": description });
        if let Some(mut stdin) = child.stdin.take() {
            // A classifier that ignores stdin closes the pipe early; that is fine.
            let _ = writeln!(stdin, "{}", input);
        }

        let output = child
            .wait_with_output()
            .map_err(|e| format!("failed to wait for classifier: {}", e))?;
        if !output.status.success() {
            return Err(format!("classifier exited with {}", output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Classifier for CommandClassifier {
    fn classify(&mut self, title: &str, description: &str) -> Classification {
        match self.run(title, description) {
            Ok(output) => parse_classification(&output),
            Err(e) => {
                tracing::warn!(error = %e, "classifier failed, using defaults");
                Classification::default()
            }
        }
    }
}
