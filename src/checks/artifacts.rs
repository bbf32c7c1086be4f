//! Required artifact checks.

use crate::policy::ArtifactSpec;
use globset::{Glob, GlobMatcher};
use std::path::Path;

/// Directories never searched when matching artifact globs.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Presence of one artifact in the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactResult {
    pub path: String,
    pub optional: bool,
    pub present: bool,
}

impl ArtifactResult {
    /// Optional artifacts never block a gate.
    pub fn satisfied(&self) -> bool {
        self.optional || self.present
    }
}

/// Check every artifact against `workspace`.
///
/// Paths containing glob metacharacters are matched against the files under
/// the workspace; anything else is a plain existence check.
pub fn check_artifacts(artifacts: &[ArtifactSpec], workspace: &Path) -> Vec<ArtifactResult> {
    artifacts
        .iter()
        .map(|artifact| ArtifactResult {
            path: artifact.path.clone(),
            optional: artifact.optional,
            present: artifact_present(&artifact.path, workspace),
        })
        .collect()
}

fn artifact_present(pattern: &str, workspace: &Path) -> bool {
    let normalized = pattern.trim().replace('\\', "/");
    let normalized = normalized.trim_start_matches("./");
    if normalized.is_empty() {
        return false;
    }

    if !is_glob(normalized) {
        return workspace.join(normalized).exists();
    }

    match Glob::new(normalized) {
        Ok(glob) => any_match(workspace, workspace, &glob.compile_matcher()),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "invalid artifact glob");
            false
        }
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn any_match(root: &Path, dir: &Path, matcher: &GlobMatcher) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");

        if matcher.is_match(&relative) {
            return true;
        }

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let skipped = entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name));
        if is_dir && !skipped && any_match(root, &path, matcher) {
            return true;
        }
    }

    false
}
