//! The verification workflow.
//!
//! ```text
//! upload ──► (pending, pending) ──trigger_verification──► (verified, pending)
//!                                                            │
//!                                            submit_decision ▼
//!                                            (verified, legit | not_legit)
//! ```
//!
//! Every guard is checked twice: once against a snapshot so obviously bad
//! requests never open a write transaction, and again against the locked row
//! so concurrent callers cannot both pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use eduvault_certificates::CertificateStore;
use eduvault_store::StorageEngine;
use eduvault_types::lifecycle::{ensure_decidable, ensure_verifiable};
use eduvault_types::{
    Certificate, CertificateId, CertificateInput, FacultyDecision, FacultyStatus, MlStatus,
    MAX_BATCH_SIZE,
};
use eduvault_utils::{EventCounters, TaskRunner};
use tracing::{debug, info, warn};

use crate::method::{FixedScore, VerificationMethod};
use crate::policy::EvidencePolicy;
use crate::VerificationError;

/// Name of the background job submitted for each uploaded certificate.
pub const VERIFICATION_JOB: &str = "ml-verification";

pub const UPLOADS: &str = "uploads";
pub const VERIFICATIONS: &str = "verifications";
pub const DECISIONS: &str = "decisions";
pub const REJECTED_TRANSITIONS: &str = "rejected_transitions";
pub const BACKGROUND_FAILURES: &str = "background_failures";

const COUNTER_NAMES: &[&str] = &[
    UPLOADS,
    VERIFICATIONS,
    DECISIONS,
    REJECTED_TRANSITIONS,
    BACKGROUND_FAILURES,
];

/// Policy layer over the certificate store.
pub struct VerificationMachine<E: StorageEngine + 'static> {
    store: Arc<CertificateStore<E>>,
    runner: Arc<dyn TaskRunner>,
    method: Arc<dyn VerificationMethod>,
    policy: EvidencePolicy,
    counters: Arc<EventCounters>,
}

impl<E: StorageEngine + 'static> VerificationMachine<E> {
    pub fn new(
        store: Arc<CertificateStore<E>>,
        runner: Arc<dyn TaskRunner>,
        policy: EvidencePolicy,
    ) -> Self {
        Self::with_method(store, runner, policy, Arc::new(FixedScore::default()))
    }

    pub fn with_method(
        store: Arc<CertificateStore<E>>,
        runner: Arc<dyn TaskRunner>,
        policy: EvidencePolicy,
        method: Arc<dyn VerificationMethod>,
    ) -> Self {
        Self {
            store,
            runner,
            method,
            policy,
            counters: Arc::new(EventCounters::new(COUNTER_NAMES)),
        }
    }

    pub fn store(&self) -> &Arc<CertificateStore<E>> {
        &self.store
    }

    pub fn policy(&self) -> &EvidencePolicy {
        &self.policy
    }

    /// Validate and store a batch, then queue machine verification for each
    /// new certificate.
    ///
    /// Returns as soon as the batch is committed. The queued verifications
    /// report failures only to the log and the `background_failures`
    /// counter, never to the uploader.
    pub fn upload(
        &self,
        inputs: Vec<CertificateInput>,
    ) -> Result<Vec<CertificateId>, VerificationError> {
        if inputs.len() > MAX_BATCH_SIZE {
            return Err(VerificationError::InvalidInput(format!(
                "at most {MAX_BATCH_SIZE} certificates per upload, got {}",
                inputs.len()
            )));
        }
        for input in &inputs {
            self.validate(input)?;
        }

        let ids = self.store.create(inputs)?;
        self.counters.add(UPLOADS, ids.len() as u64);

        for id in &ids {
            let id = *id;
            let store = Arc::clone(&self.store);
            let method = Arc::clone(&self.method);
            let counters = Arc::clone(&self.counters);
            self.runner.submit(
                VERIFICATION_JOB,
                Box::new(move || {
                    // Best effort: the uploader has already been answered.
                    if let Err(e) = verify(&store, method.as_ref(), &counters, &id) {
                        counters.increment(BACKGROUND_FAILURES);
                        warn!(
                            %id,
                            error = %e,
                            kind = %e.kind(),
                            "background verification failed"
                        );
                    }
                }),
            );
        }
        Ok(ids)
    }

    /// Move a pending certificate to machine-verified.
    pub fn trigger_verification(
        &self,
        id: &CertificateId,
    ) -> Result<Certificate, VerificationError> {
        verify(&self.store, self.method.as_ref(), &self.counters, id)
    }

    /// Record a faculty reviewer's decision on a machine-verified certificate.
    pub fn submit_decision(
        &self,
        id: &CertificateId,
        status: FacultyStatus,
        is_legit: bool,
    ) -> Result<Certificate, VerificationError> {
        let decision = FacultyDecision::try_from(status)
            .map_err(|_| VerificationError::InvalidDecision(status))?;

        let result = self
            .store
            .get_by_id(id)
            .map_err(VerificationError::from)
            .and_then(|cert| Ok(ensure_decidable(&cert)?))
            .and_then(|()| {
                Ok(self
                    .store
                    .update_faculty_decision_checked(id, decision, is_legit, ensure_decidable)?)
            });
        let cert = rejected(&self.counters, id, result)?;
        self.counters.increment(DECISIONS);
        info!(%id, ?decision, is_legit, "faculty decision accepted");
        Ok(cert)
    }

    /// The faculty review queue, oldest upload first.
    pub fn pending_review(&self, limit: i64) -> Result<Vec<Certificate>, VerificationError> {
        Ok(self.store.list_pending_faculty_review(limit)?)
    }

    pub fn certificate(&self, id: &CertificateId) -> Result<Certificate, VerificationError> {
        Ok(self.store.get_by_id(id)?)
    }

    /// Snapshot of the workflow counters, ordered by name.
    pub fn operation_counters(&self) -> BTreeMap<&'static str, u64> {
        self.counters.snapshot()
    }

    fn validate(&self, input: &CertificateInput) -> Result<(), VerificationError> {
        if input.register_number.trim().is_empty() {
            return Err(VerificationError::InvalidInput("empty register number".into()));
        }
        if input.section.trim().is_empty() {
            return Err(VerificationError::InvalidInput("empty section".into()));
        }
        self.policy.check(&input.evidence_link)
    }
}

/// Shared by the foreground trigger and the background job.
fn verify<E: StorageEngine>(
    store: &CertificateStore<E>,
    method: &dyn VerificationMethod,
    counters: &EventCounters,
    id: &CertificateId,
) -> Result<Certificate, VerificationError> {
    let result = store
        .get_by_id(id)
        .map_err(VerificationError::from)
        .and_then(|cert| {
            ensure_verifiable(&cert)?;
            Ok(cert)
        })
        .and_then(|cert| {
            let assessment = method.assess(&cert);
            Ok(store.update_machine_status_checked(
                id,
                MlStatus::Verified,
                Some(assessment.score),
                ensure_verifiable,
            )?)
        });
    let cert = rejected(counters, id, result)?;
    counters.increment(VERIFICATIONS);
    Ok(cert)
}

/// Count and log guard rejections on their way back to the caller.
fn rejected<T>(
    counters: &EventCounters,
    id: &CertificateId,
    result: Result<T, VerificationError>,
) -> Result<T, VerificationError> {
    if let Err(e) = &result {
        if e.is_rejected_transition() {
            counters.increment(REJECTED_TRANSITIONS);
            debug!(%id, kind = %e.kind(), error = %e, "transition rejected");
        }
    }
    result
}
