use std::fmt;

use eduvault_certificates::CertificateError;
use eduvault_ledger::Table;
use eduvault_store::StoreError;
use eduvault_types::{CertificateId, FacultyStatus, LifecycleError, MlStatus};
use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a [`VerificationError`], for mapping onto a
/// transport's status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    InvalidTransition,
    InvalidState,
    Archived,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::InvalidTransition => "invalid_transition",
            Self::InvalidState => "invalid_state",
            Self::Archived => "archived",
            Self::Storage => "storage",
        })
    }
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid decision: {0} (expected legit or not_legit)")]
    InvalidDecision(FacultyStatus),

    #[error("invalid evidence source pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("certificate not found: {0}")]
    NotFound(CertificateId),

    #[error("statistics record not found: {table}/{key}")]
    StatisticsNotFound { table: Table, key: String },

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

    #[error("certificate {0} is archived and cannot be modified")]
    Archived(CertificateId),

    #[error("statistics integrity violation: {0}")]
    Integrity(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl VerificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::InvalidDecision(_) | Self::InvalidPattern(_) => {
                ErrorKind::InvalidInput
            }
            Self::NotFound(_) | Self::StatisticsNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Archived(_) => ErrorKind::Archived,
            Self::Integrity(_) | Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// A lifecycle guard refused the request.
    pub fn is_rejected_transition(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidTransition | ErrorKind::InvalidState | ErrorKind::Archived
        )
    }
}

impl From<LifecycleError> for VerificationError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::Archived(id) => Self::Archived(id),
            LifecycleError::InvalidTransition { id, from, to } => {
                Self::InvalidTransition { id, from, to }
            }
            LifecycleError::InvalidState { id, ml, faculty } => {
                Self::InvalidState { id, ml, faculty }
            }
        }
    }
}

impl From<CertificateError> for VerificationError {
    fn from(e: CertificateError) -> Self {
        match e {
            CertificateError::BatchTooLarge { .. } | CertificateError::InvalidInput(_) => {
                Self::InvalidInput(e.to_string())
            }
            CertificateError::NotFound(id) => Self::NotFound(id),
            CertificateError::StatisticsNotFound { table, key } => {
                Self::StatisticsNotFound { table, key }
            }
            CertificateError::StatisticsUnderflow { .. } => Self::Integrity(e.to_string()),
            CertificateError::Lifecycle(e) => e.into(),
            CertificateError::Store(e) => Self::Storage(e),
        }
    }
}
