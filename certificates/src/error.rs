use eduvault_ledger::{LedgerError, Table};
use eduvault_store::StoreError;
use eduvault_types::{CertificateId, LifecycleError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("batch of {count} certificates exceeds the limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("certificate not found: {0}")]
    NotFound(CertificateId),

    #[error("statistics record not found: {table}/{key}")]
    StatisticsNotFound { table: Table, key: String },

    #[error("statistics counter underflow in {table}/{key}")]
    StatisticsUnderflow { table: Table, key: String },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<LedgerError> for CertificateError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound { table, key } => Self::StatisticsNotFound { table, key },
            LedgerError::Underflow { table, key } => Self::StatisticsUnderflow { table, key },
            LedgerError::InvalidKey(reason) => Self::InvalidInput(reason),
            LedgerError::Storage(e) => Self::Store(e),
        }
    }
}
