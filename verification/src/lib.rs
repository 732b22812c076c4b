//! Certificate verification workflow.
//!
//! Two stages stand between an upload and a verdict:
//! 1. **Machine verification**: a [`VerificationMethod`] scores the evidence.
//!    It runs in the background right after upload and can also be
//!    triggered explicitly.
//! 2. **Faculty review**: a reviewer marks a machine-verified certificate
//!    legit or not legit.
//!
//! Archived certificates refuse both.

pub mod error;
pub mod machine;
pub mod method;
pub mod policy;

pub use error::{ErrorKind, VerificationError};
pub use machine::{
    VerificationMachine, BACKGROUND_FAILURES, DECISIONS, REJECTED_TRANSITIONS, UPLOADS,
    VERIFICATIONS, VERIFICATION_JOB,
};
pub use method::{FixedScore, VerificationAssessment, VerificationMethod, FIXED_CONFIDENCE};
pub use policy::{EvidencePolicy, DEFAULT_SOURCE_PATTERN};
