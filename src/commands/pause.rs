//! Implementation of the `agency pause` and `agency resume` commands.
//!
//! The watchdog exits on its next audit while the stop flag exists.

use crate::context::AgencyContext;
use crate::error::{AgencyError, Result};
use std::fs;

pub fn cmd_pause(ctx: &AgencyContext) -> Result<()> {
    ctx.ensure_dirs()?;
    let flag = ctx.stop_flag_path();
    fs::write(&flag, "").map_err(|e| {
        AgencyError::UserError(format!(
            "failed to create stop flag '{}': {}",
            flag.display(),
            e
        ))
    })?;
    println!("Watchdog paused ({}).", flag.display());
    Ok(())
}

pub fn cmd_resume(ctx: &AgencyContext) -> Result<()> {
    let flag = ctx.stop_flag_path();
    match fs::remove_file(&flag) {
        Ok(()) => println!("Watchdog resumed."),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("Watchdog was not paused.")
        }
        Err(e) => {
            return Err(AgencyError::UserError(format!(
                "failed to remove stop flag '{}': {}",
                flag.display(),
                e
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHome;

    #[test]
    fn pause_then_resume_toggles_flag() {
        let home = TestHome::new();

        cmd_pause(&home.ctx).unwrap();
        assert!(home.ctx.stop_flag_path().exists());

        cmd_resume(&home.ctx).unwrap();
        assert!(!home.ctx.stop_flag_path().exists());
    }

    #[test]
    fn resume_when_not_paused_is_ok() {
        let home = TestHome::new();

        assert!(cmd_resume(&home.ctx).is_ok());
    }
}
