//! Applying worker outcomes to the task store.

use super::verdict::{Verdict, take_verdict};
use super::{Dispatcher, Gatekeeper};
use crate::error::Result;
use crate::events::Notifier;
use crate::task::{Task, TaskStatus};
use crate::worker::{Invocation, Role, Worker, WorkerOutcome};

/// What an outcome does to its task.
enum Change {
    Unchanged,
    /// Retry count or description changed; status stays.
    Updated,
    Moved(TaskStatus),
}

impl<W: Worker, G: Gatekeeper, N: Notifier> Dispatcher<W, G, N> {
    /// Reconcile one finished invocation with the (re-read) task store.
    pub(super) fn apply_outcome(
        &mut self,
        invocation: &Invocation,
        outcome: &WorkerOutcome,
    ) -> Result<()> {
        // Read the verdict even when the task vanished so it never goes stale.
        let verdict = match invocation.role {
            Role::Tester => Some(take_verdict(&self.verdict_path())),
            _ => None,
        };

        let Some(mut list) = self.store.load() else {
            tracing::warn!(task = %invocation.task_id, "task store unreadable, outcome dropped");
            return Ok(());
        };
        let Some(index) = list.position(&invocation.task_id) else {
            tracing::warn!(task = %invocation.task_id, "task disappeared, outcome dropped");
            return Ok(());
        };

        let change = {
            let task = &mut list.tasks[index];
            match invocation.role {
                Role::Planner => self.after_planner(task, outcome),
                Role::Developer => self.after_developer(task, outcome),
                Role::Tester => {
                    self.after_tester(task, outcome, verdict.unwrap_or(Verdict::Missing))
                }
            }
        };

        match change {
            Change::Unchanged => return Ok(()),
            Change::Updated => {}
            Change::Moved(status) => list.set_status(index, status),
        }
        self.store.save(&list)

    }

    /// The planner is expected to move the task to in_progress itself.
    /// When it did not, the dispatcher does so to keep the pipeline moving.
    fn after_planner(&mut self, task: &mut Task, outcome: &WorkerOutcome) -> Change {
        if !outcome.is_success() {
            tracing::warn!(task = %task.id, outcome = %outcome.describe(), "planner failed");
        }
        if task.status != TaskStatus::Pending {
            return Change::Unchanged;
        }
        tracing::info!(task = %task.id, "planner left task pending, advancing to in_progress");
        Change::Moved(TaskStatus::InProgress)
    }

    fn after_developer(&mut self, task: &mut Task, outcome: &WorkerOutcome) -> Change {
        if outcome.is_success() {
            return if task.status == TaskStatus::InProgress {
                Change::Moved(TaskStatus::ReadyForTest)
            } else {
                Change::Unchanged
            };
        }

        task.increment_retry();
        self.state.last_acted.remove(&task.id);
        tracing::warn!(
            task = %task.id,
            retries = task.retry_count,
            outcome = %outcome.describe(),
            "developer failed, will retry"
        );
        Change::Updated
    }

    fn after_tester(&mut self, task: &mut Task, outcome: &WorkerOutcome, verdict: Verdict) -> Change {
        if !outcome.is_success() {
            task.increment_retry();
            self.state.last_acted.remove(&task.id);
            tracing::warn!(
                task = %task.id,
                retries = task.retry_count,
                outcome = %outcome.describe(),
                "tester failed, will retry"
            );
            return Change::Updated;
        }

        if task.status != TaskStatus::ReadyForTest {
            tracing::info!(task = %task.id, status = %task.status, "tester changed status itself");
            return Change::Unchanged;
        }

        let failure = match verdict {
            Verdict::Pass => None,
            Verdict::Fail(detail) => Some(detail),
            Verdict::Missing if self.config.strict_verdict => {
                Some("no verdict was written".to_string())
            }
            Verdict::Ambiguous(line) if self.config.strict_verdict => {
                Some(format!("unrecognised verdict: {}", line))
            }
            Verdict::Missing | Verdict::Ambiguous(_) => {
                tracing::warn!(task = %task.id, "no usable verdict, accepting");
                None
            }
        };

        match failure {
            None => {
                self.log_activity(&format!("VERDICT task={} PASS", task.id));
                Change::Moved(TaskStatus::Completed)
            }
            Some(detail) => {
                task.append_feedback("Tester verdict: FAIL", &detail);
                task.increment_retry();
                self.log_activity(&format!("VERDICT task={} FAIL", task.id));
                Change::Moved(TaskStatus::InProgress)
            }
        }
    }
}
