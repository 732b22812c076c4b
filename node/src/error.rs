use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] eduvault_ledger::LedgerError),

    #[error("certificate error: {0}")]
    Certificate(#[from] eduvault_certificates::CertificateError),

    #[error("verification error: {0}")]
    Verification(#[from] eduvault_verification::VerificationError),

    #[error("store error: {0}")]
    Store(#[from] eduvault_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] eduvault_store_lmdb::LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
