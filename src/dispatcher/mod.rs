//! Task lifecycle state machine.
//!
//! ```text
//! pending ──planner──▶ in_progress ──developer──▶ ready_for_test ──gate + tester──▶ completed
//!                          ▲                            │
//!                          └──── gate or verdict FAIL ──┘
//! any non-terminal task over the retry limit ──▶ blocked
//! ```
//!
//! Each evaluation pass scans the store in order and acts on the first task
//! whose `(id, status)` pair differs from the last pair acted on for that id.
//! Worker invocations go through a single-concurrency [`WorkQueue`]; after each
//! invocation completes its outcome is applied to the store and a fresh pass
//! runs before the next invocation starts.

mod gatekeeper;
mod outcome;
pub mod prompts;
pub mod verdict;

#[cfg(test)]
mod tests;

pub use gatekeeper::{GateDecision, Gatekeeper, PolicyGatekeeper};

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::error::Result;
use crate::events::{Event, EventAction, Notifier};
use crate::queue::WorkQueue;
use crate::task::{TaskList, TaskStatus, TaskStore};
use crate::worker::{Invocation, Role, Worker};
use prompts::{PromptContext, build_prompt};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;

/// Component name used for events emitted by the dispatcher.
pub const COMPONENT: &str = "dispatcher";

/// In-memory dispatcher state, lost on restart:
/// a restarted dispatcher re-dispatches whatever is not terminal.
#[derive(Debug, Default)]
pub struct DispatcherState {
    /// Last status acted on, per task id.
    pub last_acted: HashMap<String, TaskStatus>,
    pub queue: WorkQueue<Invocation>,
}

/// What a single evaluation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Nothing to act on.
    Idle,
    /// A worker invocation was queued.
    Dispatched,
    /// A task changed status without a worker (gate rollback).
    Transitioned,
}

pub struct Dispatcher<W, G, N> {
    store: TaskStore,
    activity: ActivityLog,
    workspace: PathBuf,
    config: Config,
    worker: W,
    gatekeeper: G,
    notifier: N,
    state: DispatcherState,
}

impl<W: Worker, G: Gatekeeper, N: Notifier> Dispatcher<W, G, N> {
    pub fn new(
        store: TaskStore,
        activity: ActivityLog,
        workspace: PathBuf,
        config: Config,
        worker: W,
        gatekeeper: G,
        notifier: N,
    ) -> Self {
        Self {
            store,
            activity,
            workspace,
            config,
            worker,
            gatekeeper,
            notifier,
            state: DispatcherState::default(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    #[cfg(test)]
    pub fn worker(&self) -> &W {
        &self.worker
    }

    #[cfg(test)]
    pub fn gatekeeper(&self) -> &G {
        &self.gatekeeper
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Replace the runtime config (retry limit, verdict settings) for later passes.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Record tasks that are already terminal so a restarted dispatcher
    /// does not notify about them again.
    pub fn prime(&mut self) {
        let Some(list) = self.store.load() else {
            return;
        };
        for task in list.tasks.iter().filter(|t| t.status.is_terminal()) {
            self.state.last_acted.insert(task.id.clone(), task.status);
        }
    }

    /// Run passes and invocations until nothing is left to do.
    ///
    /// Returns the number of worker invocations executed.
    pub fn run_pass(&mut self) -> Result<usize> {
        let mut invocations = 0;
        loop {
            let pass = self.evaluate()?;
            if self.run_next()? {
                invocations += 1;
            } else if pass == PassOutcome::Idle && self.state.queue.is_idle() {
                return Ok(invocations);
            }
        }
    }

    /// Start the head of the queue, if any, and apply its outcome.
    pub fn run_next(&mut self) -> Result<bool> {
        let Some(invocation) = self.state.queue.start_next() else {
            return Ok(false);
        };

        self.log_activity(&format!(
            "DISPATCH role={} task={}",
            invocation.role, invocation.task_id
        ));
        let outcome = self.worker.invoke(&invocation);
        self.state.queue.complete();
        self.log_activity(&format!(
            "FINISHED role={} task={} {}",
            invocation.role,
            invocation.task_id,
            outcome.describe()
        ));

        self.apply_outcome(&invocation, &outcome)?;
        Ok(true)
    }

    /// One evaluation pass over the task store.
    pub fn evaluate(&mut self) -> Result<PassOutcome> {
        let Some(mut list) = self.store.load() else {
            return Ok(PassOutcome::Idle);
        };

        if self.enforce_retry_limit(&mut list) {
            self.store.save(&list)?;
        }

        for index in 0..list.tasks.len() {
            let task = &list.tasks[index];
            let status = task.status;
            if self.state.last_acted.get(&task.id) == Some(&status) {
                continue;
            }
            self.state.last_acted.insert(task.id.clone(), status);

            match status {
                TaskStatus::Pending => {
                    self.dispatch(Role::Planner, &list, index);
                    return Ok(PassOutcome::Dispatched);
                }
                TaskStatus::InProgress => {
                    self.dispatch(Role::Developer, &list, index);
                    return Ok(PassOutcome::Dispatched);
                }
                TaskStatus::ReadyForTest => return self.gate_then_test(&mut list, index),
                TaskStatus::Completed => {
                    let task = &list.tasks[index];
                    self.log_activity(&format!("COMPLETED task={}", task.id));
                    self.notifier.notify(
                        Event::new(EventAction::TaskCompleted, COMPONENT)
                            .with_task(&task.id)
                            .with_details(json!({
                                "title": task.title,
                                "retry_count": task.retry_count,
                            })),
                    );
                }
                TaskStatus::Blocked => {
                    let task = &list.tasks[index];
                    self.log_activity(&format!("BLOCKED task={}", task.id));
                    self.notifier.notify(
                        Event::new(EventAction::TaskBlocked, COMPONENT)
                            .with_task(&task.id)
                            .with_details(json!({
                                "title": task.title,
                                "retry_count": task.retry_count,
                            })),
                    );
                }
            }
        }

        Ok(PassOutcome::Idle)
    }

    /// Block every non-terminal task over the retry limit. Returns whether anything changed.
    fn enforce_retry_limit(&mut self, list: &mut TaskList) -> bool {
        let limit = self.config.retry_limit;
        let over: Vec<(String, u32)> = list
            .tasks
            .iter()
            .filter(|t| t.exceeds_retry_limit(limit))
            .map(|t| (t.id.clone(), t.retry_count))
            .collect();

        for (id, retries) in &over {
            let reason = format!(
                "retry limit exceeded ({} retries, limit {})",
                retries, limit
            );
            list.force_block(id, &reason);
            tracing::warn!(task = %id, retries, limit, "blocking task over retry limit");
            self.log_activity(&format!("BLOCK task={} reason=retry_limit", id));
        }

        !over.is_empty()
    }

    fn gate_then_test(&mut self, list: &mut TaskList, index: usize) -> Result<PassOutcome> {
        let decision = self.gatekeeper.check(&list.tasks[index], &self.workspace);

        if !decision.passed {
            list.set_status(index, TaskStatus::InProgress);
            let task = &mut list.tasks[index];
            task.append_feedback("Gatekeeper failed:", &decision.detail);
            task.increment_retry();
            let id = task.id.clone();
            let retries = task.retry_count;
            self.store.save(list)?;

            tracing::info!(task = %id, retries, "gate failed, back to in_progress");
            self.log_activity(&format!("GATE task={} passed=false", id));
            return Ok(PassOutcome::Transitioned);
        }

        self.log_activity(&format!("GATE task={} passed=true", list.tasks[index].id));
        verdict::clear_verdict(&self.verdict_path());
        self.dispatch(Role::Tester, list, index);
        Ok(PassOutcome::Dispatched)
    }

    fn dispatch(&mut self, role: Role, list: &TaskList, index: usize) {
        let task = &list.tasks[index];
        let verdict_path = self.verdict_path();
        let prompt = build_prompt(
            role,
            task,
            PromptContext {
                workspace: &self.workspace,
                tasks_file: self.store.path(),
                verdict_file: &verdict_path,
            },
        );

        self.state.queue.enqueue(Invocation {
            role,
            task_id: task.id.clone(),
            prompt,
            workdir: self.workspace.clone(),
        });
        tracing::info!(role = %role, task = %task.id, queued = self.state.queue.len(), "queueing worker");
    }

    fn verdict_path(&self) -> PathBuf {
        self.workspace.join(&self.config.verdict_file)
    }

    fn log_activity(&self, message: &str) {
        if let Err(e) = self.activity.append(message) {
            tracing::warn!(error = %e, "failed to write activity log");
        }
    }
}
