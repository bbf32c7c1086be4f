//! Pure detection rules evaluated on each audit.

use crate::activity::message_of;
use crate::task::{Task, TaskList};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};

static DISPATCH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^DISPATCH role=(\S+) task=(\S+)").expect("dispatch pattern is valid")
});

/// A `(role, task)` pair dispatched too often inside the audit window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopFinding {
    pub role: String,
    pub task_id: String,
    pub count: usize,
}

/// True when the liveness log is older than `threshold`.
///
/// A missing log is not a stall: the dispatcher may simply not have started.
/// A modification time in the future counts as fresh.
pub fn is_stalled(modified: Option<SystemTime>, now: SystemTime, threshold: Duration) -> bool {
    match modified {
        Some(mtime) => now
            .duration_since(mtime)
            .map(|age| age > threshold)
            .unwrap_or(false),
        None => false,
    }
}

/// Count `DISPATCH` pairs in `lines` and report every pair reaching `threshold`,
/// in order of first appearance.
pub fn find_loops<S: AsRef<str>>(lines: &[S], threshold: usize) -> Vec<LoopFinding> {
    if threshold == 0 {
        return Vec::new();
    }

    let mut order: Vec<(String, String)> = Vec::new();
    let mut counts: HashMap<(String, String), usize> = HashMap::new();

    for line in lines {
        let Some(caps) = DISPATCH_LINE.captures(message_of(line.as_ref())) else {
            continue;
        };
        let key = (caps[1].to_string(), caps[2].to_string());
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter_map(|key| {
            let count = counts[&key];
            (count >= threshold).then(|| LoopFinding {
                role: key.0,
                task_id: key.1,
                count,
            })
        })
        .collect()
}

/// First live task whose retry count is past the limit.
pub fn find_over_retry(list: &TaskList, retry_limit: u32) -> Option<&Task> {
    list.tasks.iter().find(|t| t.exceeds_retry_limit(retry_limit))
}
