//! The assembled EduVault service.

use std::sync::Arc;

use eduvault_certificates::CertificateStore;
use eduvault_ledger::{provision_section, provision_student};
use eduvault_types::{Certificate, Clock, SystemClock};
use eduvault_utils::TaskRunner;
use eduvault_verification::{EvidencePolicy, VerificationMachine};
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::engine::Engine;
use crate::reports::Reports;
use crate::NodeError;

/// Wires storage, the certificate store, the verification workflow and the
/// reports together from one [`NodeConfig`].
pub struct EduVaultNode {
    config: NodeConfig,
    engine: Arc<Engine>,
    clock: Arc<dyn Clock>,
    machine: VerificationMachine<Engine>,
    reports: Reports<Engine>,
}

impl EduVaultNode {
    pub fn open(config: NodeConfig, runner: Arc<dyn TaskRunner>) -> Result<Self, NodeError> {
        Self::open_with_clock(config, runner, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        config: NodeConfig,
        runner: Arc<dyn TaskRunner>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let policy = EvidencePolicy::new(&config.accepted_source_pattern)?;
        let engine = Arc::new(Engine::open(&config)?);
        let store = Arc::new(CertificateStore::new(Arc::clone(&engine), Arc::clone(&clock)));
        let machine = VerificationMachine::new(Arc::clone(&store), runner, policy);
        let reports = Reports::new(store);

        // Catch counter drift before serving anything.
        let audit = reports.audit()?;
        if audit.is_healthy() {
            info!(
                backend = engine.name(),
                certificates = audit.certificates_checked,
                rows = audit.rows_checked,
                "statistics consistent"
            );
        } else {
            warn!(
                backend = engine.name(),
                errors = audit.errors.len(),
                "statistics disagree with certificate rows"
            );
        }

        Ok(Self {
            config,
            engine,
            clock,
            machine,
            reports,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn machine(&self) -> &VerificationMachine<Engine> {
        &self.machine
    }

    pub fn reports(&self) -> &Reports<Engine> {
        &self.reports
    }

    /// Create the student's statistics row if it does not exist yet.
    pub fn provision_student(&self, register_number: &str) -> Result<bool, NodeError> {
        Ok(provision_student(
            self.engine.as_ref(),
            register_number.trim(),
            self.clock.now(),
        )?)
    }

    /// Create the section's statistics row if it does not exist yet.
    pub fn provision_section(&self, section: &str) -> Result<bool, NodeError> {
        Ok(provision_section(
            self.engine.as_ref(),
            section.trim(),
            self.clock.now(),
        )?)
    }

    /// The review queue; `None` uses the configured default size.
    pub fn pending_review(&self, limit: Option<i64>) -> Result<Vec<Certificate>, NodeError> {
        let limit = limit.unwrap_or(self.config.pending_review_limit);
        Ok(self.machine.pending_review(limit)?)
    }
}
