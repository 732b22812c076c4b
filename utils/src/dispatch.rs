//! Fire-and-forget background work.
//!
//! Submitting a job never reports the job's outcome to the submitter; a job
//! is expected to log its own failures. Runners are injected so tests can
//! decide when queued work actually runs.

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs outside the submitter's call stack.
pub trait TaskRunner: Send + Sync {
    /// Hand `job` off for execution. `name` labels the job in logs.
    fn submit(&self, name: &'static str, job: Job);
}

/// Runs jobs on tokio's blocking pool.
///
/// A panicking job is caught by the runtime and logged here; it never
/// propagates to whoever submitted it.
#[derive(Clone)]
pub struct TokioTaskRunner {
    handle: tokio::runtime::Handle,
}

impl TokioTaskRunner {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl TaskRunner for TokioTaskRunner {
    fn submit(&self, name: &'static str, job: Job) {
        let blocking = self.handle.spawn_blocking(job);
        self.handle.spawn(async move {
            if let Err(e) = blocking.await {
                tracing::error!(task = name, error = %e, "background task aborted");
            }
        });
    }
}
