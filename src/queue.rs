//! Single-concurrency FIFO work queue.
//!
//! At most one job is running at a time. The owner drives it explicitly:
//! `enqueue` reports whether the queue was idle, `start_next` hands out the
//! head and marks the queue running, and `complete` marks it idle again.

use std::collections::VecDeque;

#[derive(Debug)]
pub struct WorkQueue<J> {
    pending: VecDeque<J>,
    running: bool,
}

impl<J> Default for WorkQueue<J> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            running: false,
        }
    }
}

impl<J> WorkQueue<J> {
    /// Append a job. Returns `true` when nothing is running, so the caller may start it.
    pub fn enqueue(&mut self, job: J) -> bool {
        self.pending.push_back(job);
        !self.running
    }

    /// Take the head job and mark the queue running.
    ///
    /// Returns `None` while a job is running or when the queue is empty.
    pub fn start_next(&mut self) -> Option<J> {
        if self.running {
            return None;
        }
        let job = self.pending.pop_front()?;
        self.running = true;
        Some(job)
    }

    /// Mark the running job finished.
    pub fn complete(&mut self) {
        self.running = false;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True when nothing is running and nothing is waiting.
    pub fn is_idle(&self) -> bool {
        !self.running && self.is_empty()
    }
}
