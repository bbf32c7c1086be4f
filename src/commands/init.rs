//! Implementation of the `agency init` command.
//!
//! # What `agency init` does
//!
//! 1. Creates the home and `.run/logs/`
//! 2. Writes `agency.yaml` with every default spelled out (if missing)
//! 3. Creates an empty `tasks.json` (if missing)
//! 4. Creates the configured workspace directory (if missing)
//!
//! Running it again never overwrites existing files.

use crate::config::Config;
use crate::context::AgencyContext;
use crate::error::{AgencyError, Result};
use crate::fs::atomic_write_file;
use crate::task::TaskStore;
use std::fs;
use std::path::PathBuf;

pub fn cmd_init(ctx: &AgencyContext) -> Result<()> {
    let created = init_home(ctx)?;

    println!("Initialized agency home at {}", ctx.home.display());
    if created.is_empty() {
        println!("  (nothing to do, already initialized)");
    }
    for path in &created {
        println!("  created {}", path.display());
    }
    Ok(())
}

/// Returns the paths that were created.
pub(crate) fn init_home(ctx: &AgencyContext) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    ctx.ensure_dirs()?;

    let config_path = ctx.config_path();
    if !config_path.exists() {
        atomic_write_file(&config_path, &Config::default().to_yaml()?)?;
        created.push(config_path);
    }
    let config = super::load_config(ctx)?;

    let store = TaskStore::new(ctx.tasks_path());
    if !store.path().exists() {
        store.reset()?;
        created.push(store.path().to_path_buf());
    }

    let workspace = ctx.workspace_path(&config.workspace);
    if !workspace.exists() {
        fs::create_dir_all(&workspace).map_err(|e| {
            AgencyError::UserError(format!(
                "failed to create workspace '{}': {}",
                workspace.display(),
                e
            ))
        })?;
        created.push(workspace);
    }

    Ok(created)
}
