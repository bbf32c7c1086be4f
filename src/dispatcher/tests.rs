//! State machine tests with scripted workers and gatekeepers.

use super::*;
use crate::events::Event;
use crate::task::Task;
use crate::test_support::{TestHome, task};
use crate::worker::WorkerOutcome;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

type Script = Box<dyn FnMut(&Invocation) -> bool>;

/// Worker that records invocations and runs a script to decide success.
struct FakeWorker {
    calls: Vec<Invocation>,
    script: Script,
}

impl FakeWorker {
    fn new(script: impl FnMut(&Invocation) -> bool + 'static) -> Self {
        Self {
            calls: Vec::new(),
            script: Box::new(script),
        }
    }

    fn succeeding() -> Self {
        Self::new(|_| true)
    }

    fn roles(&self) -> Vec<Role> {
        self.calls.iter().map(|c| c.role).collect()
    }
}

impl Worker for FakeWorker {
    fn invoke(&mut self, invocation: &Invocation) -> WorkerOutcome {
        self.calls.push(invocation.clone());
        let ok = (self.script)(invocation);
        WorkerOutcome {
            exit_code: Some(if ok { 0 } else { 1 }),
            timed_out: false,
            error: None,
            log_path: None,
            duration: Duration::from_millis(1),
        }
    }
}

/// Gatekeeper returning queued decisions, then passing.
#[derive(Default)]
struct FakeGatekeeper {
    decisions: VecDeque<GateDecision>,
    calls: usize,
}

impl FakeGatekeeper {
    fn failing_once(detail: &str) -> Self {
        Self {
            decisions: VecDeque::from([GateDecision::fail(detail)]),
            calls: 0,
        }
    }
}

impl Gatekeeper for FakeGatekeeper {
    fn check(&mut self, _task: &Task, _workspace: &Path) -> GateDecision {
        self.calls += 1;
        self.decisions.pop_front().unwrap_or_else(GateDecision::pass)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Vec<Event>,
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, event: Event) {
        self.events.push(event);
    }
}

impl RecordingNotifier {
    fn actions(&self) -> Vec<(EventAction, String)> {
        self.events
            .iter()
            .map(|e| (e.action, e.task.clone().unwrap_or_default()))
            .collect()
    }
}

type TestDispatcher = Dispatcher<FakeWorker, FakeGatekeeper, RecordingNotifier>;

fn dispatcher(home: &TestHome, worker: FakeWorker, gatekeeper: FakeGatekeeper) -> TestDispatcher {
    dispatcher_with(home, worker, gatekeeper, Config::default())
}

fn dispatcher_with(
    home: &TestHome,
    worker: FakeWorker,
    gatekeeper: FakeGatekeeper,
    config: Config,
) -> TestDispatcher {
    Dispatcher::new(
        home.store(),
        ActivityLog::new(home.ctx.activity_log_path()),
        home.workspace(),
        config,
        worker,
        gatekeeper,
        RecordingNotifier::default(),
    )
}

fn verdict_path(home: &TestHome) -> PathBuf {
    home.workspace().join(".agency").join("test_verdict.md")
}

/// Tester script that writes `content` as the verdict.
fn tester_writes(path: PathBuf, content: &'static str) -> impl FnMut(&Invocation) -> bool {
    move |inv| {
        if inv.role == Role::Tester {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
        }
        true
    }
}

#[test]
fn planner_noop_is_force_advanced() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::Pending)]);
    let mut d = dispatcher(&home, FakeWorker::succeeding(), FakeGatekeeper::default());

    assert_eq!(d.evaluate().unwrap(), PassOutcome::Dispatched);
    assert!(d.run_next().unwrap());

    let tasks = home.tasks();
    assert_eq!(tasks[0].status, TaskStatus::InProgress);
    assert_eq!(tasks[0].retry_count, 0);
    assert_eq!(d.worker().roles(), vec![Role::Planner]);
}

#[test]
fn planner_advance_is_respected() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::Pending)]);
    let store = home.store();
    let worker = FakeWorker::new(move |_| {
        let mut list = store.load().unwrap();
        list.set_status(0, TaskStatus::InProgress);
        store.save(&list).unwrap();
        true
    });
    let mut d = dispatcher(&home, worker, FakeGatekeeper::default());

    d.evaluate().unwrap();
    d.run_next().unwrap();

    assert_eq!(home.tasks()[0].status, TaskStatus::InProgress);
}

#[test]
fn full_pipeline_completes_and_notifies_once() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::Pending)]);
    let worker = FakeWorker::new(tester_writes(verdict_path(&home), "PASS\n"));
    let mut d = dispatcher(&home, worker, FakeGatekeeper::default());

    let invocations = d.run_pass().unwrap();

    assert_eq!(invocations, 3);
    assert_eq!(
        d.worker().roles(),
        vec![Role::Planner, Role::Developer, Role::Tester]
    );
    assert_eq!(home.tasks()[0].status, TaskStatus::Completed);
    assert!(!verdict_path(&home).exists());

    assert_eq!(d.run_pass().unwrap(), 0);
    assert_eq!(
        d.notifier().actions(),
        vec![(EventAction::TaskCompleted, "task-001".to_string())]
    );
}

#[test]
fn dispatches_are_announced_in_activity_log() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::InProgress)]);
    let mut d = dispatcher(&home, FakeWorker::succeeding(), FakeGatekeeper::default());

    d.evaluate().unwrap();
    d.run_next().unwrap();

    let lines = ActivityLog::new(home.ctx.activity_log_path()).tail(10);
    assert!(
        lines
            .iter()
            .any(|l| l.ends_with("DISPATCH role=developer task=task-001"))
    );
}

#[test]
fn gatekeeper_failure_rolls_back_with_detail() {
    let home = TestHome::new();
    let mut t = task("task-001", TaskStatus::ReadyForTest);
    t.description = "Add a login form.".to_string();
    home.seed(vec![t]);
    let mut d = dispatcher(
        &home,
        FakeWorker::succeeding(),
        FakeGatekeeper::failing_once("lint error"),
    );

    assert_eq!(d.evaluate().unwrap(), PassOutcome::Transitioned);

    let task = &home.tasks()[0];
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.retry_count, 1);
    assert!(task.description.starts_with("Add a login form."));
    assert!(task.description.contains("lint error"));
    assert!(d.worker().calls.is_empty());
    assert!(d.state().queue.is_idle());
}

#[test]
fn gatekeeper_failure_feedback_reaches_developer() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::ReadyForTest)]);
    let mut d = dispatcher(
        &home,
        FakeWorker::succeeding(),
        FakeGatekeeper::failing_once("lint error"),
    );

    d.evaluate().unwrap();
    assert_eq!(d.evaluate().unwrap(), PassOutcome::Dispatched);
    d.run_next().unwrap();

    let call = &d.worker().calls[0];
    assert_eq!(call.role, Role::Developer);
    assert!(call.prompt.contains("lint error"));
}

#[test]
fn tester_fail_verdict_rolls_back_and_deletes_verdict() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::ReadyForTest)]);
    let worker = FakeWorker::new(tester_writes(verdict_path(&home), "FAIL\nmissing button"));
    let mut d = dispatcher(&home, worker, FakeGatekeeper::default());

    assert_eq!(d.evaluate().unwrap(), PassOutcome::Dispatched);
    d.run_next().unwrap();

    let task = &home.tasks()[0];
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.retry_count, 1);
    assert!(task.description.contains("missing button"));
    assert!(!verdict_path(&home).exists());
    assert_eq!(d.worker().roles(), vec![Role::Tester]);
}

#[test]
fn missing_verdict_passes_by_default() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::ReadyForTest)]);
    let mut d = dispatcher(&home, FakeWorker::succeeding(), FakeGatekeeper::default());

    d.evaluate().unwrap();
    d.run_next().unwrap();

    assert_eq!(home.tasks()[0].status, TaskStatus::Completed);
}

#[test]
fn missing_verdict_fails_when_strict() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::ReadyForTest)]);
    let config = Config {
        strict_verdict: true,
        ..Config::default()
    };
    let mut d = dispatcher_with(
        &home,
        FakeWorker::succeeding(),
        FakeGatekeeper::default(),
        config,
    );

    d.evaluate().unwrap();
    d.run_next().unwrap();

    let task = &home.tasks()[0];
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.retry_count, 1);
}

#[test]
fn stale_verdict_is_removed_before_tester_runs() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::ReadyForTest)]);
    let path = verdict_path(&home);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "PASS").unwrap();
    let config = Config {
        strict_verdict: true,
        ..Config::default()
    };
    let mut d = dispatcher_with(
        &home,
        FakeWorker::succeeding(),
        FakeGatekeeper::default(),
        config,
    );

    d.evaluate().unwrap();
    assert!(!path.exists());
    d.run_next().unwrap();

    assert_eq!(home.tasks()[0].status, TaskStatus::InProgress);
}

#[test]
fn tester_invocation_failure_stays_ready_and_regates() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::ReadyForTest)]);
    let mut failed_once = false;
    let worker = FakeWorker::new(move |_| {
        let ok = failed_once;
        failed_once = true;
        ok
    });
    let mut d = dispatcher(&home, worker, FakeGatekeeper::default());

    d.evaluate().unwrap();
    d.run_next().unwrap();

    let task = &home.tasks()[0];
    assert_eq!(task.status, TaskStatus::ReadyForTest);
    assert_eq!(task.retry_count, 1);

    assert_eq!(d.evaluate().unwrap(), PassOutcome::Dispatched);
    d.run_next().unwrap();
    assert_eq!(d.gatekeeper().calls, 2);
    assert_eq!(home.tasks()[0].status, TaskStatus::Completed);
}

#[test]
fn always_failing_developer_ends_blocked() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::InProgress)]);
    let store = home.store();
    let mut seen = Vec::new();
    let worker = FakeWorker::new(move |_| {
        let retries = store.load().unwrap().tasks[0].retry_count;
        seen.push(retries);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        false
    });
    let mut d = dispatcher(&home, worker, FakeGatekeeper::default());

    let invocations = d.run_pass().unwrap();

    assert_eq!(invocations, 6);
    let task = &home.tasks()[0];
    assert_eq!(task.status, TaskStatus::Blocked);
    assert_eq!(task.retry_count, 6);
    assert!(task.description.contains("BLOCK: retry limit exceeded"));
    assert_eq!(
        d.notifier().actions(),
        vec![(EventAction::TaskBlocked, "task-001".to_string())]
    );
}

#[test]
fn retry_limit_is_read_from_current_config() {
    let home = TestHome::new();
    let mut t = task("task-001", TaskStatus::InProgress);
    t.retry_count = 2;
    home.seed(vec![t]);
    let mut d = dispatcher(&home, FakeWorker::succeeding(), FakeGatekeeper::default());

    d.set_config(Config {
        retry_limit: 1,
        ..Config::default()
    });
    assert_eq!(d.evaluate().unwrap(), PassOutcome::Idle);

    assert_eq!(home.tasks()[0].status, TaskStatus::Blocked);
    assert!(d.worker().calls.is_empty());
}

#[test]
fn one_task_per_pass_in_store_order() {
    let home = TestHome::new();
    home.seed(vec![
        task("task-001", TaskStatus::Pending),
        task("task-002", TaskStatus::Pending),
    ]);
    let mut d = dispatcher(&home, FakeWorker::succeeding(), FakeGatekeeper::default());

    assert_eq!(d.evaluate().unwrap(), PassOutcome::Dispatched);
    assert_eq!(d.state().queue.len(), 1);

    d.run_next().unwrap();
    assert_eq!(d.worker().calls[0].task_id, "task-001");
}

#[test]
fn same_pair_is_never_dispatched_twice() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::Pending)]);
    let mut d = dispatcher(&home, FakeWorker::succeeding(), FakeGatekeeper::default());

    assert_eq!(d.evaluate().unwrap(), PassOutcome::Dispatched);
    assert_eq!(d.evaluate().unwrap(), PassOutcome::Idle);

    assert_eq!(d.state().queue.len(), 1);
    assert_eq!(
        d.state().last_acted.get("task-001"),
        Some(&TaskStatus::Pending)
    );
}

#[test]
fn missing_or_corrupt_store_is_idle() {
    let home = TestHome::new();
    let mut d = dispatcher(&home, FakeWorker::succeeding(), FakeGatekeeper::default());
    assert_eq!(d.evaluate().unwrap(), PassOutcome::Idle);

    std::fs::write(home.ctx.tasks_path(), "{ broken").unwrap();
    assert_eq!(d.run_pass().unwrap(), 0);
}

#[test]
fn primed_dispatcher_does_not_renotify_terminal_tasks() {
    let home = TestHome::new();
    home.seed(vec![
        task("task-001", TaskStatus::Completed),
        task("task-002", TaskStatus::Blocked),
    ]);
    let mut d = dispatcher(&home, FakeWorker::succeeding(), FakeGatekeeper::default());

    d.prime();
    d.run_pass().unwrap();

    assert!(d.notifier().events.is_empty());
}

#[test]
fn task_removed_mid_invocation_is_ignored() {
    let home = TestHome::new();
    home.seed(vec![task("task-001", TaskStatus::InProgress)]);
    let store = home.store();
    let worker = FakeWorker::new(move |_| {
        store.reset().unwrap();
        false
    });
    let mut d = dispatcher(&home, worker, FakeGatekeeper::default());

    d.evaluate().unwrap();
    d.run_next().unwrap();

    assert!(home.tasks().is_empty());
}
