//! Exit code constants for the agency CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state)
//! - 2: Configuration failure
//! - 3: Task store failure
//! - 4: Worker command failure
//! - 5: Process control failure
//! - 6: Gate failure (`agency gate`)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid state.
pub const USER_ERROR: i32 = 1;

/// Runtime configuration missing required values or malformed.
pub const CONFIG_FAILURE: i32 = 2;

/// Task store could not be persisted.
pub const STORE_FAILURE: i32 = 3;

/// Worker command could not be prepared or launched.
pub const WORKER_FAILURE: i32 = 4;

/// Dispatcher could not be terminated or relaunched.
pub const PROCESS_FAILURE: i32 = 5;

/// Definition-of-done gate did not pass.
pub const GATE_FAILURE: i32 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            CONFIG_FAILURE,
            STORE_FAILURE,
            WORKER_FAILURE,
            PROCESS_FAILURE,
            GATE_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
        assert_eq!(USER_ERROR, 1);
    }
}
