//! Default value functions used by the Config struct.

/// Worker command template. Placeholders: `{role}`, `{prompt}`, `{workdir}`, `{task_id}`.
pub const DEFAULT_AGENT_COMMAND: &str = "opencode run --agent {role} --dir {workdir} {prompt}";

/// Verdict artifact the tester writes, relative to the workspace.
pub const DEFAULT_VERDICT_FILE: &str = ".agency/test_verdict.md";

// Default value functions for serde
pub(crate) fn default_agent_command() -> String {
    DEFAULT_AGENT_COMMAND.to_string()
}
pub(crate) fn default_workspace() -> String {
    "workspace".to_string()
}
pub(crate) fn default_worker_timeout_secs() -> u64 {
    300
}
pub(crate) fn default_check_timeout_secs() -> u64 {
    600
}
pub(crate) fn default_dispatch_interval_ms() -> u64 {
    2000
}
pub(crate) fn default_retry_limit() -> u32 {
    5
}
pub(crate) fn default_loop_threshold() -> usize {
    4
}
pub(crate) fn default_loop_window_lines() -> usize {
    50
}
pub(crate) fn default_audit_interval_secs() -> u64 {
    30
}
pub(crate) fn default_stall_threshold_secs() -> u64 {
    300
}
pub(crate) fn default_max_log_lines() -> usize {
    500
}
pub(crate) fn default_verdict_file() -> String {
    DEFAULT_VERDICT_FILE.to_string()
}
