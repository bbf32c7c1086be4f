//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{AgencyError, Result};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            AgencyError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path`, or the defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                AgencyError::ConfigError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            AgencyError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `agent_command` must be non-empty and reference `{prompt}`
    /// - `worker_timeout_secs`, `check_timeout_secs`, `audit_interval_secs` and
    ///   `stall_threshold_secs` must be positive
    /// - `loop_threshold` must be positive and `loop_window_lines` at least `loop_threshold`
    /// - `max_log_lines` must be at least `loop_window_lines`
    /// - `verdict_file` must be a relative path
    pub fn validate(&self) -> Result<()> {
        if self.agent_command.trim().is_empty() {
            return Err(invalid("agent_command must not be empty"));
        }
        if !self.agent_command.contains("{prompt}") {
            return Err(invalid("agent_command must contain the {prompt} placeholder"));
        }

        if self.worker_timeout_secs == 0 {
            return Err(invalid("worker_timeout_secs must be greater than 0"));
        }
        if self.check_timeout_secs == 0 {
            return Err(invalid("check_timeout_secs must be greater than 0"));
        }
        if self.audit_interval_secs == 0 {
            return Err(invalid("audit_interval_secs must be greater than 0"));
        }
        if self.stall_threshold_secs == 0 {
            return Err(invalid("stall_threshold_secs must be greater than 0"));
        }

        if self.loop_threshold == 0 {
            return Err(invalid("loop_threshold must be greater than 0"));
        }
        if self.loop_window_lines < self.loop_threshold {
            return Err(AgencyError::ConfigError(format!(
                "config validation failed: loop_window_lines ({}) must be at least loop_threshold ({})",
                self.loop_window_lines, self.loop_threshold
            )));
        }
        if self.max_log_lines < self.loop_window_lines {
            return Err(AgencyError::ConfigError(format!(
                "config validation failed: max_log_lines ({}) must be at least loop_window_lines ({})",
                self.max_log_lines, self.loop_window_lines
            )));
        }

        if self.verdict_file.trim().is_empty() || Path::new(&self.verdict_file).is_absolute() {
            return Err(AgencyError::ConfigError(format!(
                "config validation failed: verdict_file must be a relative path (found '{}')",
                self.verdict_file
            )));
        }

        Ok(())
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    pub fn audit_interval(&self) -> Duration {
        Duration::from_secs(self.audit_interval_secs)
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_threshold_secs)
    }
}

fn invalid(message: &str) -> AgencyError {
    AgencyError::ConfigError(format!("config validation failed: {}", message))
}
