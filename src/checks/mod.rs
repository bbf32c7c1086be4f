//! Definition of Done verification.
//!
//! - [`scope`] narrows a policy's checks to a task's declared scope
//! - [`runner`] executes check commands in the workspace
//! - [`artifacts`] verifies required files and globs exist
//! - [`gate`] combines both into a pass/fail decision

pub mod artifacts;
pub mod gate;
pub mod runner;
pub mod scope;

pub use artifacts::{ArtifactResult, check_artifacts};
pub use gate::{GateReport, evaluate_gate, run_gate};
pub use runner::{CheckResult, CheckRunner};
pub use scope::filter_checks_by_scope;
