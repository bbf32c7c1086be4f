//! Out-of-band supervisor for the dispatcher.
//!
//! Each audit reads only durable files (the stop flag, the activity log, the
//! Task Store) and performs at most one healing action. The first matching
//! cause wins:
//!
//! 1. stop flag present: stop auditing
//! 2. stall: the activity log has not changed within the stall threshold
//! 3. logic loop: one `(role, task)` pair dominates the recent dispatches
//! 4. integrity: a live task is past the retry limit
//!
//! A stall restarts the dispatcher. A loop or integrity finding blocks the
//! task first, then restarts. Blocking is idempotent: a task that is already
//! terminal (completed or blocked) is not a finding.

pub mod detect;
pub mod process;


pub use detect::{LoopFinding, find_loops, find_over_retry, is_stalled};
pub use process::{PidRecord, ProcessControl, SystemProcessControl, WorkerRecord};

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::error::Result;
use crate::events::{Event, EventAction, Notifier};
use crate::task::TaskStore;
use serde_json::json;
use std::path::PathBuf;
use std::time::SystemTime;

/// Component name used for events emitted by the watchdog.
pub const COMPONENT: &str = "watchdog";

/// Why a task was blocked by the watchdog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealCause {
    Loop { role: String, count: usize },
    RetryLimit { retry_count: u32 },
}

impl HealCause {
    fn label(&self) -> &'static str {
        match self {
            HealCause::Loop { .. } => "logic_loop",
            HealCause::RetryLimit { .. } => "retry_limit",
        }
    }
}

/// Result of one audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Stop flag present; the caller should exit.
    Stopped,
    Healthy,
    /// Stalled dispatcher was terminated and relaunched.
    Restarted,
    /// A task was blocked and the dispatcher relaunched.
    Healed { task_id: String, cause: HealCause },
}

pub struct Watchdog<P, N> {
    store: TaskStore,
    activity: ActivityLog,
    watchdog_log: ActivityLog,
    stop_flag: PathBuf,
    config: Config,
    process: P,
    notifier: N,
}

impl<P: ProcessControl, N: Notifier> Watchdog<P, N> {
    pub fn new(
        store: TaskStore,
        activity: ActivityLog,
        watchdog_log: ActivityLog,
        stop_flag: PathBuf,
        config: Config,
        process: P,
        notifier: N,
    ) -> Self {
        Self {
            store,
            activity,
            watchdog_log,
            stop_flag,
            config,
            process,
            notifier,
        }
    }

    #[cfg(test)]
    pub fn process(&self) -> &P {
        &self.process
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Audit against the current time.
    pub fn audit(&mut self) -> Result<AuditOutcome> {
        self.audit_at(SystemTime::now())
    }

    /// Audit as if the current time were `now`.
    pub fn audit_at(&mut self, now: SystemTime) -> Result<AuditOutcome> {
        if self.stop_flag.exists() {
            self.log(&format!(
                "stop flag present at {}, exiting",
                self.stop_flag.display()
            ));
            return Ok(AuditOutcome::Stopped);
        }

        let outcome = self.detect_and_heal(now)?;
        self.rotate_logs();
        Ok(outcome)
    }

    fn detect_and_heal(&mut self, now: SystemTime) -> Result<AuditOutcome> {
        if is_stalled(self.activity.modified(), now, self.config.stall_threshold()) {
            self.log(&format!(
                "STALL activity log idle for more than {}s",
                self.config.stall_threshold_secs
            ));
            self.restart()?;
            // Restart the stall clock so the next audit waits for the new dispatcher.
            self.activity.touch()?;
            self.notifier.notify(
                Event::new(EventAction::DispatcherRestarted, COMPONENT).with_details(json!({
                    "cause": "stall",
                    "threshold_secs": self.config.stall_threshold_secs,
                })),
            );
            return Ok(AuditOutcome::Restarted);
        }

        let window = self.activity.tail(self.config.loop_window_lines);
        for finding in find_loops(&window, self.config.loop_threshold) {
            let cause = HealCause::Loop {
                role: finding.role.clone(),
                count: finding.count,
            };
            let reason = format!(
                "logic loop: role {} dispatched {} times in the last {} log lines",
                finding.role, finding.count, self.config.loop_window_lines
            );
            if let Some(outcome) = self.heal(&finding.task_id, cause, &reason)? {
                return Ok(outcome);
            }
        }

        let over_retry = self.store.load().and_then(|list| {
            find_over_retry(&list, self.config.retry_limit).map(|t| (t.id.clone(), t.retry_count))
        });
        if let Some((task_id, retry_count)) = over_retry {
            let reason = format!(
                "retry limit exceeded ({} retries, limit {})",
                retry_count, self.config.retry_limit
            );
            if let Some(outcome) =
                self.heal(&task_id, HealCause::RetryLimit { retry_count }, &reason)?
            {
                return Ok(outcome);
            }
        }

        Ok(AuditOutcome::Healthy)
    }

    /// Block `task_id` and restart the dispatcher.
    ///
    /// Returns `None` when the task is missing or already terminal.
    fn heal(
        &mut self,
        task_id: &str,
        cause: HealCause,
        reason: &str,
    ) -> Result<Option<AuditOutcome>> {
        let blockable = self
            .store
            .load()
            .and_then(|list| list.find(task_id).map(|t| !t.status.is_terminal()))
            .unwrap_or(false);
        if !blockable {
            return Ok(None);
        }

        // The dispatcher is the usual writer; stop it before touching the store.
        self.terminate();
        if !self.store.force_block(task_id, reason)? {
            self.relaunch()?;
            return Ok(None);
        }
        self.log(&format!(
            "HEAL task={} cause={} reason={}",
            task_id,
            cause.label(),
            reason
        ));
        self.relaunch()?;
        self.activity.touch()?;

        self.notifier.notify(
            Event::new(EventAction::DispatcherHealed, COMPONENT)
                .with_task(task_id)
                .with_details(json!({
                    "cause": cause.label(),
                    "reason": reason,
                })),
        );

        Ok(Some(AuditOutcome::Healed {
            task_id: task_id.to_string(),
            cause,
        }))
    }

    fn restart(&mut self) -> Result<()> {
        self.terminate();
        self.relaunch()
    }

    fn terminate(&mut self) {
        match self.process.terminate() {
            Ok(Some(pid)) => self.log(&format!("TERMINATE pid={}", pid)),
            Ok(None) => self.log("TERMINATE no dispatcher running"),
            Err(e) => self.log(&format!("TERMINATE failed: {}", e)),
        }
    }

    fn relaunch(&mut self) -> Result<()> {
        match self.process.relaunch() {
            Ok(pid) => {
                self.log(&format!("RELAUNCH pid={}", pid));
                Ok(())
            }
            Err(e) => {
                self.log(&format!("RELAUNCH failed: {}", e));
                Err(e)
            }
        }
    }

    fn rotate_logs(&self) {
        for log in [&self.activity, &self.watchdog_log] {
            if let Err(e) = log.rotate(self.config.max_log_lines) {
                tracing::warn!(path = %log.path().display(), error = %e, "log rotation failed");
            }
        }
    }

    fn log(&self, message: &str) {
        tracing::info!("{}", message);
        if let Err(e) = self.watchdog_log.append(message) {
            tracing::warn!(error = %e, "failed to write watchdog log");
        }
    }
}
