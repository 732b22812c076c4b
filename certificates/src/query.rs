//! Read-side certificate queries.

use std::cmp::Reverse;

use eduvault_store::{ReadTxn, StorageEngine};
use eduvault_types::{Certificate, CertificateId};

use crate::{CertificateError, CertificateStore};

/// Review queue size used when the caller passes a non-positive limit.
pub const DEFAULT_REVIEW_LIMIT: usize = 50;

impl<E: StorageEngine> CertificateStore<E> {
    pub fn get_by_id(&self, id: &CertificateId) -> Result<Certificate, CertificateError> {
        self.engine.read(|r: &dyn ReadTxn| {
            r.get_certificate(id)?
                .ok_or(CertificateError::NotFound(*id))
        })
    }

    /// Certificates awaiting a faculty decision, oldest upload first.
    pub fn list_pending_faculty_review(
        &self,
        limit: i64,
    ) -> Result<Vec<Certificate>, CertificateError> {
        let limit = usize::try_from(limit)
            .ok()
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_REVIEW_LIMIT);
        let mut pending = self.scan(|c| c.awaits_faculty_review())?;
        pending.sort_by_key(Certificate::upload_order);
        pending.truncate(limit);
        Ok(pending)
    }

    /// A student's live certificates, newest upload first.
    pub fn list_by_student(
        &self,
        register_number: &str,
    ) -> Result<Vec<Certificate>, CertificateError> {
        require_key("register number", register_number)?;
        self.newest_first(|c| c.register_number == register_number)
    }

    /// A section's live certificates, newest upload first.
    pub fn list_by_section(&self, section: &str) -> Result<Vec<Certificate>, CertificateError> {
        require_key("section", section)?;
        self.newest_first(|c| c.section == section)
    }

    /// Live certificates uploaded by one faculty member, newest upload first.
    pub fn list_by_uploader(&self, uploader: &str) -> Result<Vec<Certificate>, CertificateError> {
        require_key("uploader", uploader)?;
        self.newest_first(|c| c.uploaded_by == uploader)
    }

    fn newest_first(
        &self,
        mut filter: impl FnMut(&Certificate) -> bool,
    ) -> Result<Vec<Certificate>, CertificateError> {
        let mut rows = self.scan(|c| !c.archived && filter(c))?;
        rows.sort_by_key(|c| Reverse(c.upload_order()));
        Ok(rows)
    }

    fn scan(
        &self,
        mut filter: impl FnMut(&Certificate) -> bool,
    ) -> Result<Vec<Certificate>, CertificateError> {
        self.engine
            .read(|r: &dyn ReadTxn| Ok::<_, CertificateError>(r.scan_certificates(&mut filter)?))
    }
}

fn require_key(what: &str, value: &str) -> Result<(), CertificateError> {
    if value.trim().is_empty() {
        return Err(CertificateError::InvalidInput(format!("empty {what}")));
    }
    Ok(())
}
