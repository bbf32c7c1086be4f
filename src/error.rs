//! Error types for agency.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Worker failures, check failures and corrupt state files are *not* errors:
//! they are ordinary outcomes the state machine handles. `AgencyError` is
//! reserved for conditions the caller cannot route around.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for agency operations.
#[derive(Error, Debug)]
pub enum AgencyError {
    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Runtime configuration could not be read or failed validation.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The task store could not be written.
    #[error("Task store error: {0}")]
    StoreError(String),

    /// A worker command could not be prepared (bad template, unparsable command).
    #[error("Worker error: {0}")]
    WorkerError(String),

    /// Dispatcher process control (pid record, terminate, relaunch) failed.
    #[error("Process control failed: {0}")]
    ProcessError(String),

    /// `agency gate` evaluated a task and the gate did not pass.
    #[error("Gate failed: {0}")]
    GateFailed(String),
}

impl AgencyError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            AgencyError::UserError(_) => exit_codes::USER_ERROR,
            AgencyError::ConfigError(_) => exit_codes::CONFIG_FAILURE,
            AgencyError::StoreError(_) => exit_codes::STORE_FAILURE,
            AgencyError::WorkerError(_) => exit_codes::WORKER_FAILURE,
            AgencyError::ProcessError(_) => exit_codes::PROCESS_FAILURE,
            AgencyError::GateFailed(_) => exit_codes::GATE_FAILURE,
        }
    }
}

/// Result type alias for agency operations.
pub type Result<T> = std::result::Result<T, AgencyError>;
