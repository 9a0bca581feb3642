//! The source of work items shared by all workers of a run.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a single request of a run by its index in `0..total`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Job(u64);

impl Job {
    /// The index of this job within its run.
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fixed set of jobs, handed out exactly once each.
///
/// The jobs of a run are the indices `0..total`, all of which exist once the source is created.
/// Taking a job never waits, so a worker that stops early leaves nothing blocked behind it.
#[derive(Debug)]
pub(crate) struct JobSource {
    total: u64,
    cursor: AtomicU64,
}

impl JobSource {
    /// Creates a source of `total` jobs.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            cursor: AtomicU64::new(0),
        }
    }

    /// Takes the next job, or returns `None` once all jobs have been taken.
    pub fn next_job(&self) -> Option<Job> {
        // The cursor never moves past `total`, even with many exhausted workers polling.
        self.cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |taken| {
                (taken < self.total).then_some(taken + 1)
            })
            .ok()
            .map(Job)
    }

    /// Number of jobs not yet taken.
    pub fn remaining(&self) -> u64 {
        self.total - self.cursor.load(Ordering::Relaxed)
    }
}
