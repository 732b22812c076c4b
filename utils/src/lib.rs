//! Shared utilities for EduVault.

pub mod dispatch;
pub mod logging;
pub mod stats;

pub use dispatch::{Job, TaskRunner, TokioTaskRunner};
pub use logging::{init_logging, LogFormat};
pub use stats::EventCounters;
