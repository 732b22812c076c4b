//! Dashboard aggregates and export lists.
//!
//! Figures here are computed from live (non-archived) certificate rows. The
//! statistics tables are cumulative and keep counting archived certificates,
//! so they are only consulted by [`Reports::audit`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use eduvault_certificates::CertificateStore;
use eduvault_ledger::{audit_statistics, AuditReport};
use eduvault_store::StorageEngine;
use eduvault_types::{Certificate, FacultyStatus, MlStatus, Timestamp};

use crate::NodeError;

/// Certificate counts by faculty status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: u64,
    pub legit: u64,
    pub not_legit: u64,
    pub pending: u64,
    pub ml_verified: u64,
}

impl Tally {
    fn count(&mut self, cert: &Certificate) {
        self.total += 1;
        match cert.faculty_status {
            FacultyStatus::Pending => self.pending += 1,
            FacultyStatus::Legit => self.legit += 1,
            FacultyStatus::NotLegit => self.not_legit += 1,
        }
        if cert.ml_status == MlStatus::Verified {
            self.ml_verified += 1;
        }
    }

    /// Share of certificates judged legit; zero when there are none.
    pub fn verification_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.legit as f64 / self.total as f64
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Overview {
    pub total_students: u64,
    #[serde(flatten)]
    pub certificates: Tally,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectionSummary {
    pub section: String,
    #[serde(flatten)]
    pub certificates: Tally,
    pub verification_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudentSummary {
    pub register_number: String,
    pub student_name: String,
    pub section: String,
    #[serde(flatten)]
    pub certificates: Tally,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    Section,
    Student,
}

/// A filtered certificate list ready for rendering.
#[derive(Clone, Debug, Serialize)]
pub struct ExportList {
    pub scope: ExportScope,
    pub key: String,
    /// Sheet or document title, e.g. `Section-CSE A`.
    pub label: String,
    pub certificates: Vec<Certificate>,
}

impl ExportList {
    fn new(scope: ExportScope, key: &str, certificates: Vec<Certificate>) -> Self {
        let label = match scope {
            ExportScope::Section => format!("Section-{key}"),
            ExportScope::Student => format!("Student-{key}"),
        };
        Self {
            scope,
            key: key.to_string(),
            label,
            certificates,
        }
    }

    /// Suggested file name, e.g. `certificates_section_CSE_A_1700000000.json`.
    pub fn file_name(&self, at: Timestamp, extension: &str) -> String {
        let scope = match self.scope {
            ExportScope::Section => "section",
            ExportScope::Student => "student",
        };
        format!(
            "certificates_{scope}_{}_{}.{extension}",
            sanitize_for_file_name(&self.key),
            at.as_secs()
        )
    }
}

/// Spaces become underscores; an empty key stands for everything.
pub fn sanitize_for_file_name(key: &str) -> String {
    if key.is_empty() {
        return "all".to_string();
    }
    key.replace(' ', "_")
}

/// Read-only views for dashboards and exports.
pub struct Reports<E: StorageEngine> {
    store: Arc<CertificateStore<E>>,
}

impl<E: StorageEngine> Reports<E> {
    pub fn new(store: Arc<CertificateStore<E>>) -> Self {
        Self { store }
    }

    fn live(&self) -> Result<Vec<Certificate>, NodeError> {
        self.store
            .engine()
            .read(|r| Ok::<_, NodeError>(r.scan_certificates(&mut |c| !c.archived)?))
    }

    pub fn overview(&self) -> Result<Overview, NodeError> {
        let live = self.live()?;
        let mut overview = Overview::default();
        let mut students = BTreeSet::new();
        for cert in &live {
            overview.certificates.count(cert);
            students.insert(cert.register_number.as_str());
        }
        overview.total_students = students.len() as u64;
        Ok(overview)
    }

    /// One row per section with live certificates, ordered by section.
    pub fn section_summaries(&self) -> Result<Vec<SectionSummary>, NodeError> {
        let mut by_section: BTreeMap<String, Tally> = BTreeMap::new();
        for cert in self.live()? {
            by_section.entry(cert.section.clone()).or_default().count(&cert);
        }
        Ok(by_section
            .into_iter()
            .map(|(section, certificates)| SectionSummary {
                section,
                verification_rate: certificates.verification_rate(),
                certificates,
            })
            .collect())
    }

    /// Per-student counts over the certificates one faculty member uploaded,
    /// ordered by register number.
    pub fn student_summaries_by_uploader(
        &self,
        uploader: &str,
    ) -> Result<Vec<StudentSummary>, NodeError> {
        // Newest first, so the first name seen per student is the latest.
        let certs = self.store.list_by_uploader(uploader.trim())?;
        let mut rows: BTreeMap<(String, String), StudentSummary> = BTreeMap::new();
        for cert in &certs {
            rows.entry((cert.register_number.clone(), cert.section.clone()))
                .or_insert_with(|| StudentSummary {
                    register_number: cert.register_number.clone(),
                    student_name: cert.student_name.clone(),
                    section: cert.section.clone(),
                    certificates: Tally::default(),
                })
                .certificates
                .count(cert);
        }
        Ok(rows.into_values().collect())
    }

    pub fn certificates_for_section(&self, section: &str) -> Result<ExportList, NodeError> {
        let section = section.trim();
        let certs = self.store.list_by_section(section)?;
        Ok(ExportList::new(ExportScope::Section, section, certs))
    }

    pub fn certificates_for_student(&self, register_number: &str) -> Result<ExportList, NodeError> {
        let register_number = register_number.trim();
        let certs = self.store.list_by_student(register_number)?;
        Ok(ExportList::new(ExportScope::Student, register_number, certs))
    }

    /// Reconcile the statistics tables with the certificate rows.
    pub fn audit(&self) -> Result<AuditReport, NodeError> {
        Ok(audit_statistics(self.store.engine().as_ref())?)
    }
}
