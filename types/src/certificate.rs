//! The certificate record and its upload payload.

use serde::{Deserialize, Serialize};

use crate::id::CertificateId;
use crate::lifecycle::CertificateState;
use crate::status::{FacultyStatus, MlStatus};
use crate::time::Timestamp;

/// Maximum number of certificates accepted in one upload.
pub const MAX_BATCH_SIZE: usize = 10;

/// What an uploader supplies for one certificate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInput {
    /// Link to the evidence document (opaque URI).
    pub evidence_link: String,
    pub register_number: String,
    pub section: String,
    pub student_name: String,
    /// Identifier of the faculty member uploading on the student's behalf.
    pub uploaded_by: String,
    /// Defaults to "now" when absent.
    #[serde(default)]
    pub uploaded_at: Option<Timestamp>,
}

/// A stored certificate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub evidence_link: String,
    pub register_number: String,
    pub section: String,
    pub student_name: String,
    pub uploaded_by: String,
    pub uploaded_at: Timestamp,
    /// Engine-assigned insertion order; breaks ties between equal upload times.
    pub sequence: u64,
    pub ml_status: MlStatus,
    pub faculty_status: FacultyStatus,
    pub is_legit: Option<bool>,
    pub ml_score: Option<f64>,
    pub archived: bool,
}

impl Certificate {
    /// Normalize an upload payload into a fresh record.
    ///
    /// Both statuses start at pending and the record is never archived,
    /// whatever the caller intended.
    pub fn from_input(input: CertificateInput, now: Timestamp, sequence: u64) -> Self {
        let uploaded_at = input.uploaded_at.unwrap_or(now);
        let id = CertificateId::derive(
            &input.evidence_link,
            &input.register_number,
            uploaded_at,
            sequence,
        );
        Self {
            id,
            evidence_link: input.evidence_link,
            register_number: input.register_number,
            section: input.section,
            student_name: input.student_name,
            uploaded_by: input.uploaded_by,
            uploaded_at,
            sequence,
            ml_status: MlStatus::Pending,
            faculty_status: FacultyStatus::Pending,
            is_legit: None,
            ml_score: None,
            archived: false,
        }
    }

    pub fn state(&self) -> CertificateState {
        CertificateState::of(self)
    }

    /// Key for "oldest upload first" ordering.
    pub fn upload_order(&self) -> (Timestamp, u64) {
        (self.uploaded_at, self.sequence)
    }

    /// Eligible for the faculty review queue.
    pub fn awaits_faculty_review(&self) -> bool {
        !self.archived
            && self.ml_status == MlStatus::Verified
            && self.faculty_status == FacultyStatus::Pending
    }
}
