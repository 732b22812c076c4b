//! Error types shared by the entity model.

use thiserror::Error;

use crate::id::CertificateId;
use crate::status::{FacultyStatus, MlStatus};

/// Malformed values at the edge of the model.
#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid certificate id: {0}")]
    InvalidCertificateId(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("{0} is not a faculty decision")]
    NotADecision(FacultyStatus),
}

/// A requested transition does not fit the certificate's current lifecycle state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("certificate {0} is archived and cannot be modified")]
    Archived(CertificateId),

    #[error("certificate {id}: machine status cannot move from {from} to {to}")]
    InvalidTransition {
        id: CertificateId,
        from: MlStatus,
        to: MlStatus,
    },

    #[error("certificate {id}: faculty decision not allowed in state ({ml}, {faculty})")]
    InvalidState {
        id: CertificateId,
        ml: MlStatus,
        faculty: FacultyStatus,
    },
}
