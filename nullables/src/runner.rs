//! Nullable task runner: background jobs run only when the test says so.

use eduvault_utils::{Job, TaskRunner};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Queues submitted jobs until [`NullTaskRunner::run_pending`] is called.
#[derive(Default)]
pub struct NullTaskRunner {
    queue: Mutex<VecDeque<(&'static str, Job)>>,
}

impl NullTaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<(&'static str, Job)>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of jobs waiting to run.
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    /// Names of the queued jobs, oldest first.
    pub fn pending_names(&self) -> Vec<&'static str> {
        self.queue().iter().map(|(name, _)| *name).collect()
    }

    /// Run every queued job (including jobs queued while running) on the
    /// calling thread. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Pop under the lock, run outside it: jobs may submit more jobs.
            let next = self.queue().pop_front();
            match next {
                Some((_, job)) => {
                    job();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Drop every queued job without running it.
    pub fn discard_pending(&self) -> usize {
        let mut queue = self.queue();
        let n = queue.len();
        queue.clear();
        n
    }
}

impl TaskRunner for NullTaskRunner {
    fn submit(&self, name: &'static str, job: Job) {
        self.queue().push_back((name, job));
    }
}
