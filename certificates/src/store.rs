//! Transactional certificate mutations.
//!
//! Lock order inside every transaction: certificate rows, then student
//! statistics rows, then section statistics rows. Statistics keys touched by
//! a batch are visited in sorted order.

use std::collections::BTreeMap;
use std::sync::Arc;

use eduvault_ledger::{apply_section, apply_student};
use eduvault_store::{StorageEngine, WriteTxn};
use eduvault_types::lifecycle::ensure_mutable;
use eduvault_types::{
    Certificate, CertificateId, CertificateInput, Clock, CounterDelta, FacultyDecision,
    FacultyStatus, LifecycleError, MlStatus, MAX_BATCH_SIZE,
};
use tracing::info;

use crate::CertificateError;

/// Certificate rows plus the statistics they drive.
pub struct CertificateStore<E: StorageEngine> {
    pub(crate) engine: Arc<E>,
    clock: Arc<dyn Clock>,
}

impl<E: StorageEngine> CertificateStore<E> {
    pub fn new(engine: Arc<E>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Store a batch of new certificates and count them against their
    /// student and section rows.
    ///
    /// Both statistics rows must already exist for every certificate; if
    /// any is missing nothing is stored.
    pub fn create(
        &self,
        inputs: Vec<CertificateInput>,
    ) -> Result<Vec<CertificateId>, CertificateError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        if inputs.len() > MAX_BATCH_SIZE {
            return Err(CertificateError::BatchTooLarge {
                count: inputs.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        let now = self.clock.now();
        let ids = self.engine.write(|txn| {
            let mut ids = Vec::with_capacity(inputs.len());
            let mut students: BTreeMap<String, CounterDelta> = BTreeMap::new();
            let mut sections: BTreeMap<String, CounterDelta> = BTreeMap::new();

            for input in inputs {
                let sequence = txn.next_sequence()?;
                let cert = Certificate::from_input(input, now, sequence);
                txn.insert_certificate(&cert)?;

                let student = students.entry(cert.register_number.clone()).or_default();
                *student = *student + CounterDelta::UPLOADED;
                let section = sections.entry(cert.section.clone()).or_default();
                *section = *section + CounterDelta::UPLOADED;
                ids.push(cert.id);
            }

            for (register_number, delta) in &students {
                apply_student(txn, register_number, *delta, now)?;
            }
            for (section, delta) in &sections {
                apply_section(txn, section, *delta, now)?;
            }
            Ok::<_, CertificateError>(ids)
        })?;

        info!(count = ids.len(), "certificates created");
        Ok(ids)
    }

    /// Set the machine-verification status and score.
    pub fn update_machine_status(
        &self,
        id: &CertificateId,
        status: MlStatus,
        score: Option<f64>,
    ) -> Result<Certificate, CertificateError> {
        self.update_machine_status_checked(id, status, score, |_| Ok(()))
    }

    /// Like [`update_machine_status`](Self::update_machine_status), but
    /// `guard` is evaluated against the locked row first. A guard error
    /// aborts the transaction untouched.
    pub fn update_machine_status_checked<G>(
        &self,
        id: &CertificateId,
        status: MlStatus,
        score: Option<f64>,
        guard: G,
    ) -> Result<Certificate, CertificateError>
    where
        G: FnOnce(&Certificate) -> Result<(), LifecycleError>,
    {
        let now = self.clock.now();
        let cert = self.engine.write(|txn| {
            let mut cert = locked(txn, id)?;
            guard(&cert)?;
            ensure_mutable(&cert)?;
            if !cert.ml_status.can_become(status) {
                return Err(LifecycleError::InvalidTransition {
                    id: *id,
                    from: cert.ml_status,
                    to: status,
                }
                .into());
            }

            let newly_verified =
                cert.ml_status == MlStatus::Pending && status == MlStatus::Verified;
            cert.ml_status = status;
            cert.ml_score = score;
            txn.update_certificate(&cert)?;

            if newly_verified {
                apply_student(txn, &cert.register_number, CounterDelta::ML_VERIFIED, now)?;
                apply_section(txn, &cert.section, CounterDelta::ML_VERIFIED, now)?;
            }
            Ok::<_, CertificateError>(cert)
        })?;

        info!(
            id = %cert.id,
            status = %cert.ml_status,
            score = ?cert.ml_score,
            "machine status updated"
        );
        Ok(cert)
    }

    /// Record a faculty decision.
    ///
    /// Counters move only when the certificate was still awaiting a
    /// decision. Overwriting an earlier decision stores the new status but
    /// leaves the counters alone, so a changed verdict shows up as drift in
    /// `audit_statistics` until the counters are repaired.
    pub fn update_faculty_decision(
        &self,
        id: &CertificateId,
        decision: FacultyDecision,
        is_legit: bool,
    ) -> Result<Certificate, CertificateError> {
        self.update_faculty_decision_checked(id, decision, is_legit, |_| Ok(()))
    }

    /// Like [`update_faculty_decision`](Self::update_faculty_decision) with
    /// a guard evaluated against the locked row.
    pub fn update_faculty_decision_checked<G>(
        &self,
        id: &CertificateId,
        decision: FacultyDecision,
        is_legit: bool,
        guard: G,
    ) -> Result<Certificate, CertificateError>
    where
        G: FnOnce(&Certificate) -> Result<(), LifecycleError>,
    {
        let now = self.clock.now();
        let cert = self.engine.write(|txn| {
            let mut cert = locked(txn, id)?;
            guard(&cert)?;
            ensure_mutable(&cert)?;
            if cert.ml_status != MlStatus::Verified {
                return Err(LifecycleError::InvalidState {
                    id: *id,
                    ml: cert.ml_status,
                    faculty: cert.faculty_status,
                }
                .into());
            }

            let first_decision = cert.faculty_status.is_pending();
            cert.faculty_status = FacultyStatus::from(decision);
            cert.is_legit = Some(is_legit);
            txn.update_certificate(&cert)?;

            if first_decision {
                apply_student(
                    txn,
                    &cert.register_number,
                    CounterDelta::student_decision(decision),
                    now,
                )?;
                apply_section(txn, &cert.section, CounterDelta::section_decision(decision), now)?;
            }
            Ok::<_, CertificateError>(cert)
        })?;

        info!(
            id = %cert.id,
            decision = %cert.faculty_status,
            is_legit,
            "faculty decision recorded"
        );
        Ok(cert)
    }

    /// Mark a certificate archived. Archiving twice is a no-op.
    pub fn archive(&self, id: &CertificateId) -> Result<Certificate, CertificateError> {
        let (cert, changed) = self.engine.write(|txn| {
            let mut cert = locked(txn, id)?;
            if cert.archived {
                return Ok::<_, CertificateError>((cert, false));
            }
            cert.archived = true;
            txn.update_certificate(&cert)?;
            Ok((cert, true))
        })?;
        if changed {
            info!(id = %cert.id, "certificate archived");
        }
        Ok(cert)
    }
}

fn locked(txn: &mut dyn WriteTxn, id: &CertificateId) -> Result<Certificate, CertificateError> {
    txn.certificate_for_update(id)?
        .ok_or(CertificateError::NotFound(*id))
}
