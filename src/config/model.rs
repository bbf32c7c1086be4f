//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for an agency home.
///
/// This struct represents the contents of `<home>/agency.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Worker settings
    // =========================================================================
    /// Command template used to invoke a worker (shell-words parsed; no shell).
    #[serde(default = "default_agent_command")]
    pub agent_command: String,

    /// Workspace the workers modify and the checks run in, relative to the home.
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Hard wall-clock limit for one worker invocation.
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,

    /// Wall-clock limit for one Definition of Done check; a hung check fails.
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,

    // =========================================================================
    // Dispatcher settings
    // =========================================================================
    /// Pause between dispatch passes when the dispatcher runs as a loop.
    #[serde(default = "default_dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,

    /// A task whose retry count exceeds this value is blocked.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Verdict artifact written by the tester, relative to the workspace.
    #[serde(default = "default_verdict_file")]
    pub verdict_file: String,

    /// Treat a missing or ambiguous verdict as a failure instead of a pass.
    #[serde(default)]
    pub strict_verdict: bool,

    /// External classifier consulted by `agency add` (shell-words parsed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier_command: Option<String>,

    // =========================================================================
    // Watchdog settings
    // =========================================================================
    /// Seconds between watchdog audits.
    #[serde(default = "default_audit_interval_secs")]
    pub audit_interval_secs: u64,

    /// Seconds without liveness-log activity before the dispatcher counts as stalled.
    #[serde(default = "default_stall_threshold_secs")]
    pub stall_threshold_secs: u64,

    /// Identical dispatches within the window that count as a logic loop.
    #[serde(default = "default_loop_threshold")]
    pub loop_threshold: usize,

    /// Number of trailing activity-log lines inspected for loops.
    #[serde(default = "default_loop_window_lines")]
    pub loop_window_lines: usize,

    /// Activity and watchdog logs are trimmed to this many lines.
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent_command: default_agent_command(),
            workspace: default_workspace(),
            worker_timeout_secs: default_worker_timeout_secs(),
            check_timeout_secs: default_check_timeout_secs(),
            dispatch_interval_ms: default_dispatch_interval_ms(),
            retry_limit: default_retry_limit(),
            verdict_file: default_verdict_file(),
            strict_verdict: false,
            classifier_command: None,
            audit_interval_secs: default_audit_interval_secs(),
            stall_threshold_secs: default_stall_threshold_secs(),
            loop_threshold: default_loop_threshold(),
            loop_window_lines: default_loop_window_lines(),
            max_log_lines: default_max_log_lines(),
        }
    }
}
