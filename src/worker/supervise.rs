//! Child process supervision shared by workers and checks.
//!
//! Children run in their own process group so a kill reaches everything they
//! started. Waiting polls `try_wait` against a wall-clock deadline and touches
//! an optional heartbeat log so the watchdog sees progress.

use crate::activity::ActivityLog;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// How a supervised child finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Waited {
    /// `None` when the child was killed or ended by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Put the child in a new process group (unix).
pub(crate) fn isolate(command: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = command;
}

/// Wait for `child`, killing its process group once `timeout` elapses.
pub(crate) fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    heartbeat: Option<&ActivityLog>,
) -> Waited {
    let start = Instant::now();
    let mut last_beat = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Waited {
                    exit_code: status.code(),
                    timed_out: false,
                };
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process_tree(child);
                    return Waited {
                        exit_code: None,
                        timed_out: true,
                    };
                }
                if last_beat.elapsed() >= HEARTBEAT_INTERVAL {
                    beat(heartbeat);
                    last_beat = Instant::now();
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                tracing::warn!(pid = child.id(), error = %e, "failed to poll child, killing it");
                kill_process_tree(child);
                return Waited {
                    exit_code: None,
                    timed_out: false,
                };
            }
        }
    }
}

fn beat(heartbeat: Option<&ActivityLog>) {
    if let Some(log) = heartbeat
        && let Err(e) = log.touch()
    {
        tracing::debug!(error = %e, "heartbeat failed");
    }
}

/// Read a child pipe to the end on a background thread.
pub(crate) fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Kill the child's whole process group (unix) or the child itself, then reap it.
pub(crate) fn kill_process_tree(child: &mut Child) {
    let _ = kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

/// Kill every process in group `pgid` (unix) or the tree rooted at `pgid` (windows).
#[cfg(unix)]
pub(crate) fn kill_group(pgid: u32) -> std::io::Result<()> {
    run_kill("kill", &["-KILL", "--", &format!("-{}", pgid)])
}

#[cfg(windows)]
pub(crate) fn kill_group(pgid: u32) -> std::io::Result<()> {
    run_kill("taskkill", &["/F", "/T", "/PID", &pgid.to_string()])
}

/// Kill the single process `pid`.
#[cfg(unix)]
pub(crate) fn kill_pid(pid: u32) -> std::io::Result<()> {
    run_kill("kill", &["-9", &pid.to_string()])
}

#[cfg(windows)]
pub(crate) fn kill_pid(pid: u32) -> std::io::Result<()> {
    run_kill("taskkill", &["/F", "/T", "/PID", &pid.to_string()])
}

fn run_kill(program: &str, args: &[&str]) -> std::io::Result<()> {
    let status = Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("{} exited with {}", program, status)))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn spawn_isolated(script: &str) -> Child {
        let mut command = Command::new("sh");
        command.args(["-c", script]).stdin(Stdio::null());
        isolate(&mut command);
        command.spawn().unwrap()
    }

    #[test]
    fn test_wait_reports_exit_code() {
        let mut child = spawn_isolated("exit 7");

        let waited = wait_with_timeout(&mut child, Duration::from_secs(10), None);

        assert_eq!(
            waited,
            Waited {
                exit_code: Some(7),
                timed_out: false
            }
        );
    }

    #[test]
    fn test_timeout_kills_group_and_closes_pipes() {
        let mut command = Command::new("sh");
        command
            .args(["-c", "sleep 30 & sleep 30"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped());
        isolate(&mut command);
        let mut child = command.spawn().unwrap();
        let stdout = drain(child.stdout.take());

        let started = Instant::now();
        let waited = wait_with_timeout(&mut child, Duration::from_millis(300), None);
        let _ = stdout.join().unwrap();

        assert!(waited.timed_out);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_kill_group_stops_running_group() {
        let mut child = spawn_isolated("sleep 30");

        kill_group(child.id()).unwrap();
        let status = child.wait().unwrap();

        assert!(!status.success());
    }
}
