//! Task store model for agency.
//!
//! The backlog lives in `<home>/tasks.json` as `{ "tasks": [...] }`. Tasks are
//! kept in store order; the dispatcher always acts on the first eligible one.
//!
//! - Known fields are typed; unknown fields are preserved verbatim
//! - Loading fails soft: a missing or corrupt store reads as "no tasks"
//! - Saving rewrites the whole file atomically (last full save wins)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

mod io;
mod mutations;

pub use io::TaskStore;

/// Prefix of generated task ids (`task-001`, `task-002`, ...).
pub const TASK_ID_PREFIX: &str = "task-";

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    ReadyForTest,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::ReadyForTest => "ready_for_test",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
        }
    }

    /// Completed and blocked tasks never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Blocked)
    }

    pub const ALL: [TaskStatus; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::ReadyForTest,
        Self::Completed,
        Self::Blocked,
    ];
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification narrowing which checks apply to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Full,
    BackendOnly,
    FrontendOnly,
    DocOnly,
    Unknown,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::BackendOnly => "backend_only",
            Self::FrontendOnly => "frontend_only",
            Self::DocOnly => "doc_only",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a scope name, case-insensitively.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "backend_only" => Some(Self::BackendOnly),
            "frontend_only" => Some(Self::FrontendOnly),
            "doc_only" => Some(Self::DocOnly),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intent of a task as reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskType {
    Feature,
    Fix,
    Doc,
    Verify,
    Explore,
    #[default]
    Unknown,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "FEATURE",
            Self::Fix => "FIX",
            Self::Doc => "DOC",
            Self::Verify => "VERIFY",
            Self::Explore => "EXPLORE",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a task type name, case-insensitively.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FEATURE" => Some(Self::Feature),
            "FIX" => Some(Self::Fix),
            "DOC" => Some(Self::Doc),
            "VERIFY" => Some(Self::Verify),
            "EXPLORE" => Some(Self::Explore),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One task in the backlog.
///
/// Known fields are explicitly typed, while unknown fields are preserved
/// in the `extra` map for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Instructions for the developer; failure feedback is appended here.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub retry_count: u32,

    #[serde(default)]
    pub scope: Scope,

    #[serde(default)]
    pub task_type: TaskType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    /// A fresh pending task with default scope and type.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            retry_count: 0,
            scope: Scope::default(),
            task_type: TaskType::default(),
            created_at: None,
            extra: BTreeMap::new(),
        }
    }
}

/// The whole task store document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub tasks: Vec<Task>,

    /// Unknown top-level fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
