//! Entity model for EduVault.
//!
//! Certificates, the two statistics tables they feed, the status enums of the
//! two-stage verification workflow, and the lifecycle guards every layer
//! above relies on.

pub mod certificate;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod statistics;
pub mod status;
pub mod time;

pub use certificate::{Certificate, CertificateInput, MAX_BATCH_SIZE};
pub use error::{LifecycleError, TypesError};
pub use id::CertificateId;
pub use lifecycle::CertificateState;
pub use statistics::{CounterDelta, Counters, SectionStatistics, StudentStatistics};
pub use status::{FacultyDecision, FacultyStatus, MlStatus};
pub use time::{Clock, SystemClock, Timestamp};
