use std::fmt;

use thiserror::Error;

/// The aggregate table a ledger error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Table {
    Students,
    Sections,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Table::Students => "student_statistics",
            Table::Sections => "section_statistics",
        })
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("statistics record not found: {table}/{key}")]
    NotFound { table: Table, key: String },

    #[error("statistics counter underflow in {table}/{key}")]
    Underflow { table: Table, key: String },

    #[error("invalid statistics key: {0}")]
    InvalidKey(String),

    #[error("storage error: {0}")]
    Storage(#[from] eduvault_store::StoreError),
}
