//! Reconciliation of the statistics tables against the certificate rows.
//!
//! The counters are derived data. Recomputing them from the certificates and
//! comparing detects drift early, before it shows up on a dashboard.

use std::collections::BTreeMap;

use eduvault_store::{ReadTxn, StorageEngine};
use eduvault_types::{Certificate, Counters, FacultyStatus, MlStatus};
use tracing::warn;

use crate::error::Table;
use crate::LedgerError;

/// Outcome of [`audit_statistics`].
#[derive(Clone, Debug, Default)]
pub struct AuditReport {
    pub certificates_checked: u64,
    pub rows_checked: u64,
    pub errors: Vec<String>,
}

impl AuditReport {
    /// Returns `true` if every row matched its certificates.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

fn count_student(counters: &mut Counters, cert: &Certificate) {
    counters.total_uploaded += 1;
    match cert.faculty_status {
        FacultyStatus::Pending => counters.pending += 1,
        FacultyStatus::Legit => counters.legit += 1,
        FacultyStatus::NotLegit => counters.not_legit += 1,
    }
    if cert.ml_status == MlStatus::Verified {
        counters.ml_verified += 1;
    }
}

fn count_section(counters: &mut Counters, cert: &Certificate) {
    counters.total_uploaded += 1;
    match cert.faculty_status {
        FacultyStatus::Pending => counters.pending += 1,
        FacultyStatus::Legit => counters.legit += 1,
        FacultyStatus::NotLegit => {}
    }
    if cert.ml_status == MlStatus::Verified {
        counters.ml_verified += 1;
    }
}

fn compare(
    report: &mut AuditReport,
    table: Table,
    stored: BTreeMap<String, Counters>,
    expected: &BTreeMap<String, Counters>,
) {
    for (key, counters) in expected {
        match stored.get(key) {
            Some(row) if row == counters => {}
            Some(row) => report.errors.push(format!(
                "{table}/{key}: stored {row:?}, certificates imply {counters:?}"
            )),
            None => report
                .errors
                .push(format!("{table}/{key}: referenced by certificates but missing")),
        }
    }
    for (key, row) in &stored {
        if !expected.contains_key(key) && *row != Counters::default() {
            report
                .errors
                .push(format!("{table}/{key}: counts {row:?} without certificates"));
        }
    }
    report.rows_checked += stored.len() as u64;
}

/// Recompute every counter from the certificate rows in one consistent read
/// and report rows that disagree.
pub fn audit_statistics<E: StorageEngine>(engine: &E) -> Result<AuditReport, LedgerError> {
    let (certificates, students, sections) = engine.read(|r: &dyn ReadTxn| {
        Ok::<_, LedgerError>((
            r.scan_certificates(&mut |_| true)?,
            r.iter_student_statistics()?,
            r.iter_section_statistics()?,
        ))
    })?;

    let mut by_student: BTreeMap<String, Counters> = BTreeMap::new();
    let mut by_section: BTreeMap<String, Counters> = BTreeMap::new();
    for cert in &certificates {
        count_student(
            by_student.entry(cert.register_number.clone()).or_default(),
            cert,
        );
        count_section(by_section.entry(cert.section.clone()).or_default(), cert);
    }

    let mut report = AuditReport {
        certificates_checked: certificates.len() as u64,
        ..AuditReport::default()
    };
    compare(
        &mut report,
        Table::Students,
        students
            .into_iter()
            .map(|s| (s.register_number, s.counters))
            .collect(),
        &by_student,
    );
    compare(
        &mut report,
        Table::Sections,
        sections
            .into_iter()
            .map(|s| (s.section, s.counters))
            .collect(),
        &by_section,
    );

    for error in &report.errors {
        warn!(%error, "statistics drift");
    }
    Ok(report)
}
