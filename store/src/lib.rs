//! Abstract transactional storage for EduVault.
//!
//! Every engine (LMDB, in-memory for testing) implements [`StorageEngine`].
//! The rest of the codebase only talks to these traits.
//!
//! A write transaction is all-or-nothing: [`StorageEngine::write`] commits
//! when the closure returns `Ok` and discards every staged change otherwise.
//! The `*_for_update` accessors lock the row they return until the
//! transaction ends, so two transactions touching the same certificate or
//! statistics row are serialized.

pub mod error;

pub use error::StoreError;

use eduvault_types::{Certificate, CertificateId, SectionStatistics, StudentStatistics};

/// Read access to committed rows.
pub trait ReadTxn {
    fn get_certificate(&self, id: &CertificateId) -> Result<Option<Certificate>, StoreError>;

    /// Every certificate for which `filter` returns true, in no particular order.
    fn scan_certificates(
        &self,
        filter: &mut dyn FnMut(&Certificate) -> bool,
    ) -> Result<Vec<Certificate>, StoreError>;

    fn get_student_statistics(
        &self,
        register_number: &str,
    ) -> Result<Option<StudentStatistics>, StoreError>;

    fn get_section_statistics(&self, section: &str)
        -> Result<Option<SectionStatistics>, StoreError>;

    fn iter_student_statistics(&self) -> Result<Vec<StudentStatistics>, StoreError>;

    fn iter_section_statistics(&self) -> Result<Vec<SectionStatistics>, StoreError>;
}

/// A write transaction. Reads through it observe its own staged writes.
pub trait WriteTxn: ReadTxn {
    /// Lock and return a certificate row (`SELECT … FOR UPDATE`).
    fn certificate_for_update(
        &mut self,
        id: &CertificateId,
    ) -> Result<Option<Certificate>, StoreError>;

    /// Insert a new certificate. Fails with [`StoreError::Duplicate`] if the id exists.
    fn insert_certificate(&mut self, cert: &Certificate) -> Result<(), StoreError>;

    /// Overwrite a certificate previously locked by this transaction.
    fn update_certificate(&mut self, cert: &Certificate) -> Result<(), StoreError>;

    fn student_statistics_for_update(
        &mut self,
        register_number: &str,
    ) -> Result<Option<StudentStatistics>, StoreError>;

    fn put_student_statistics(&mut self, stats: &StudentStatistics) -> Result<(), StoreError>;

    fn section_statistics_for_update(
        &mut self,
        section: &str,
    ) -> Result<Option<SectionStatistics>, StoreError>;

    fn put_section_statistics(&mut self, stats: &SectionStatistics) -> Result<(), StoreError>;

    /// Next value of the certificate insertion sequence (starts at 1).
    fn next_sequence(&mut self) -> Result<u64, StoreError>;
}

/// A transactional storage backend.
pub trait StorageEngine: Send + Sync {
    /// Run `f` against a consistent view of committed data.
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&dyn ReadTxn) -> Result<T, E>;

    /// Run `f` inside a single write transaction.
    ///
    /// Commits if `f` returns `Ok`; otherwise every change made through the
    /// transaction is rolled back and `f`'s error is returned unchanged.
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>;
}
