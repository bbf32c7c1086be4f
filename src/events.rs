//! Notification events.
//!
//! Notices meant for a human (task completed, task blocked, dispatcher
//! restarted or healed) are appended in NDJSON format to
//! `<home>/.run/notifications.ndjson`. Delivering them (chat bot, mail) is
//! left to whatever tails that file.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (`task_completed`, `task_blocked`, ...)
//! - `actor`: the emitting process (`dispatcher@HOST` or `watchdog@HOST`)
//! - `task`: optional task ID
//! - `details`: freeform object with action-specific details

use crate::error::{AgencyError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Actions that can be recorded as notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    TaskAdded,
    TaskCompleted,
    TaskBlocked,
    /// Watchdog terminated and relaunched a stalled dispatcher.
    DispatcherRestarted,
    /// Watchdog blocked a task and relaunched the dispatcher.
    DispatcherHealed,
    StoreReset,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::TaskAdded => write!(f, "task_added"),
            EventAction::TaskCompleted => write!(f, "task_completed"),
            EventAction::TaskBlocked => write!(f, "task_blocked"),
            EventAction::DispatcherRestarted => write!(f, "dispatcher_restarted"),
            EventAction::DispatcherHealed => write!(f, "dispatcher_healed"),
            EventAction::StoreReset => write!(f, "store_reset"),
        }
    }
}

/// A notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    pub actor: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    pub details: Value,
}

impl Event {
    /// Create an event stamped now, attributed to `component@HOST`.
    pub fn new(action: EventAction, component: &str) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(component),
            task: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task = Some(task_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            AgencyError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

fn actor_string(component: &str) -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", component, host)
}

/// Sink for notification events.
pub trait Notifier {
    fn notify(&mut self, event: Event);
}

/// Appends events to an NDJSON file. Write failures are logged, not raised:
/// a lost notification must never stop the dispatcher.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one event as a single JSON line.
    pub fn append(&self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;

        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                AgencyError::UserError(format!(
                    "failed to create events directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                AgencyError::UserError(format!(
                    "failed to open events file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            AgencyError::UserError(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Read back every well-formed event.
    pub fn read_all(&self) -> Vec<Event> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl Notifier for EventLog {
    fn notify(&mut self, event: Event) {
        tracing::info!(action = %event.action, task = ?event.task, "notification");
        if let Err(e) = self.append(&event) {
            tracing::warn!(error = %e, "failed to record notification");
        }
    }
}
