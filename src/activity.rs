//! Append-only text logs with timestamped lines.
//!
//! The dispatcher's activity log doubles as its liveness signal: the watchdog
//! reads its modification time for stall detection and its tail for loop
//! detection. Each line is `[<RFC3339>] <message>`.

use crate::error::{AgencyError, Result};
use chrono::{SecondsFormat, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Handle on one timestamped log file.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

/// Lines kept by a rotation and the log's modification time when it was read.
struct Trimmed {
    kept: String,
    mtime: Option<SystemTime>,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one `[timestamp] message` line.
    pub fn append(&self, message: &str) -> Result<()> {
        let mut file = self.open_append()?;
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        writeln!(file, "[{}] {}", ts, message).map_err(|e| {
            AgencyError::UserError(format!(
                "failed to write log '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    /// The last `n` lines, oldest first. A missing log has no lines.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].iter().map(|l| l.to_string()).collect()
    }

    /// Modification time, or `None` when the log does not exist.
    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    /// Refresh the modification time without adding a line.
    pub fn touch(&self) -> Result<()> {
        let file = self.open_append()?;
        file.set_modified(SystemTime::now()).map_err(|e| {
            AgencyError::UserError(format!(
                "failed to refresh log '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Trim the log to its last `max_lines` lines. Returns whether anything was dropped.
    ///
    /// Lines appended while trimming are carried into the new file. The
    /// modification time survives rotation unless such lines arrived, so
    /// trimming is not liveness.
    pub fn rotate(&self, max_lines: usize) -> Result<bool> {
        let Ok(mut old) = File::open(&self.path) else {
            return Ok(false);
        };
        let Some(trimmed) = self.trim(&mut old, max_lines)? else {
            return Ok(false);
        };
        self.replace(old, trimmed)?;
        Ok(true)
    }

    /// Read `old` to its end and keep the last `max_lines` lines.
    ///
    /// Returns `None` when nothing would be dropped.
    fn trim(&self, old: &mut File, max_lines: usize) -> Result<Option<Trimmed>> {
        let mtime = old.metadata().and_then(|m| m.modified()).ok();
        let mut content = String::new();
        old.read_to_string(&mut content)
            .map_err(|e| self.io_error("failed to read log", e))?;

        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= max_lines {
            return Ok(None);
        }

        let mut kept = lines[lines.len() - max_lines..].join("\n");
        // A trailing partial line is completed by whatever the writer appends next.
        if !kept.is_empty() && content.ends_with('\n') {
            kept.push('\n');
        }
        Ok(Some(Trimmed { kept, mtime }))
    }

    /// Replace the log with `trimmed` plus anything appended to `old` since it was read.
    fn replace(&self, mut old: File, trimmed: Trimmed) -> Result<()> {
        let Trimmed { mut kept, mtime } = trimmed;
        let before = kept.len();
        old.read_to_string(&mut kept)
            .map_err(|e| self.io_error("failed to read log", e))?;
        crate::fs::atomic_write_file(&self.path, &kept)?;

        // Appends that reached the old file after the rename.
        let mut late = String::new();
        old.read_to_string(&mut late)
            .map_err(|e| self.io_error("failed to read log", e))?;
        if !late.is_empty() {
            self.open_append()?
                .write_all(late.as_bytes())
                .map_err(|e| self.io_error("failed to write log", e))?;
        }

        if kept.len() == before && late.is_empty()
            && let Some(mtime) = mtime
        {
            self.open_append()?
                .set_modified(mtime)
                .map_err(|e| self.io_error("failed to restore mtime of", e))?;
        }
        Ok(())
    }

    /// Empty the log, keeping the file.
    pub fn truncate(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        File::create(&self.path).map(|_| ()).map_err(|e| {
            AgencyError::UserError(format!(
                "failed to truncate log '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    fn io_error(&self, what: &str, e: std::io::Error) -> AgencyError {
        AgencyError::UserError(format!("{} '{}': {}", what, self.path.display(), e))
    }

    fn open_append(&self) -> Result<File> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                AgencyError::UserError(format!(
                    "failed to create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                AgencyError::UserError(format!(
                    "failed to open log '{}': {}",
                    self.path.display(),
                    e
                ))
            })
    }
}

/// Strip the `[timestamp] ` prefix from a log line.
pub fn message_of(line: &str) -> &str {
    match line.strip_prefix('[').and_then(|rest| rest.split_once("] ")) {
        Some((_, message)) => message,
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn log_in(dir: &TempDir) -> ActivityLog {
        ActivityLog::new(dir.path().join(".run").join("agency.log"))
    }

    #[test]
    fn append_writes_timestamped_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = log_in(&temp_dir);

        log.append("DISPATCH role=planner task=task-001").unwrap();
        log.append("second").unwrap();

        let lines = log.tail(10);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert_eq!(message_of(&lines[0]), "DISPATCH role=planner task=task-001");
        assert_eq!(message_of(&lines[1]), "second");
    }

    #[test]
    fn tail_of_missing_log_is_empty() {
        let temp_dir = TempDir::new().unwrap();

        assert!(log_in(&temp_dir).tail(50).is_empty());
        assert!(log_in(&temp_dir).modified().is_none());
    }

    #[test]
    fn tail_returns_last_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = log_in(&temp_dir);
        for i in 0..10 {
            log.append(&format!("line {}", i)).unwrap();
        }

        let tail = log.tail(3);

        let messages: Vec<&str> = tail.iter().map(|l| message_of(l)).collect();
        assert_eq!(messages, vec!["line 7", "line 8", "line 9"]);
    }

    #[test]
    fn touch_refreshes_modified_time() {
        let temp_dir = TempDir::new().unwrap();
        let log = log_in(&temp_dir);
        log.append("start").unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600);
        OpenOptions::new()
            .append(true)
            .open(log.path())
            .unwrap()
            .set_modified(old)
            .unwrap();

        log.touch().unwrap();

        assert!(log.modified().unwrap() > old + Duration::from_secs(60));
        assert_eq!(log.tail(10).len(), 1);
    }

    #[test]
    fn rotate_keeps_last_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = log_in(&temp_dir);
        for i in 0..8 {
            log.append(&format!("line {}", i)).unwrap();
        }

        assert!(log.rotate(5).unwrap());
        assert!(!log.rotate(5).unwrap());

        let lines = log.tail(100);
        assert_eq!(lines.len(), 5);
        assert_eq!(message_of(&lines[0]), "line 3");
    }

    #[test]
    fn rotate_preserves_modified_time() {
        let temp_dir = TempDir::new().unwrap();
        let log = log_in(&temp_dir);
        for i in 0..8 {
            log.append(&format!("line {}", i)).unwrap();
        }
        let old = SystemTime::now() - Duration::from_secs(3600);
        OpenOptions::new()
            .append(true)
            .open(log.path())
            .unwrap()
            .set_modified(old)
            .unwrap();

        log.rotate(2).unwrap();

        assert!(log.modified().unwrap() < old + Duration::from_secs(1));
    }

    #[test]
    fn rotate_keeps_lines_appended_while_trimming() {
        let temp_dir = TempDir::new().unwrap();
        let log = log_in(&temp_dir);
        for i in 0..8 {
            log.append(&format!("line {}", i)).unwrap();
        }
        let mut old = File::open(log.path()).unwrap();

        let trimmed = log.trim(&mut old, 3).unwrap().unwrap();
        log.append("DISPATCH role=developer task=task-001").unwrap();
        log.replace(old, trimmed).unwrap();

        let messages: Vec<String> = log.tail(100).iter().map(|l| message_of(l).to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "line 5",
                "line 6",
                "line 7",
                "DISPATCH role=developer task=task-001"
            ]
        );
    }

    #[test]
    fn rotate_completes_partial_trailing_line() {
        let temp_dir = TempDir::new().unwrap();
        let log = log_in(&temp_dir);
        std::fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        std::fs::write(log.path(), "a\nb\nc\npart").unwrap();
        let mut old = File::open(log.path()).unwrap();

        let trimmed = log.trim(&mut old, 2).unwrap().unwrap();
        OpenOptions::new()
            .append(true)
            .open(log.path())
            .unwrap()
            .write_all(b"ial\n")
            .unwrap();
        log.replace(old, trimmed).unwrap();

        assert_eq!(std::fs::read_to_string(log.path()).unwrap(), "c\npartial\n");
    }

    #[test]
    fn truncate_empties_log() {
        let temp_dir = TempDir::new().unwrap();
        let log = log_in(&temp_dir);
        log.append("x").unwrap();

        log.truncate().unwrap();

        assert!(log.tail(10).is_empty());
        assert!(log.path().exists());
    }

    #[test]
    fn message_of_plain_line() {
        assert_eq!(message_of("no prefix here"), "no prefix here");
    }
}
