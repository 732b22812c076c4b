//! Lifecycle states and the guards for each transition.
//!
//! ```text
//! Uploaded(pending, pending)
//!     --trigger_verification-->  MachineVerified(verified, pending)
//!     --submit_decision------->  FacultyDecided(verified, legit | not_legit)
//! ```
//!
//! `Duplicate` and `Archived` block every transition.

use serde::{Deserialize, Serialize};

use crate::certificate::Certificate;
use crate::error::LifecycleError;
use crate::status::{FacultyDecision, FacultyStatus, MlStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateState {
    Uploaded,
    MachineVerified,
    FacultyDecided(FacultyDecision),
    Duplicate,
    Archived,
}

impl CertificateState {
    pub fn of(cert: &Certificate) -> Self {
        if cert.archived {
            return Self::Archived;
        }
        match (cert.ml_status, cert.faculty_status) {
            (MlStatus::Duplicate, _) => Self::Duplicate,
            (MlStatus::Pending, _) => Self::Uploaded,
            (MlStatus::Verified, FacultyStatus::Pending) => Self::MachineVerified,
            (MlStatus::Verified, FacultyStatus::Legit) => {
                Self::FacultyDecided(FacultyDecision::Legit)
            }
            (MlStatus::Verified, FacultyStatus::NotLegit) => {
                Self::FacultyDecided(FacultyDecision::NotLegit)
            }
        }
    }

    /// No further transition is possible from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FacultyDecided(_) | Self::Duplicate | Self::Archived
        )
    }
}

/// Archived certificates reject every status change.
pub fn ensure_mutable(cert: &Certificate) -> Result<(), LifecycleError> {
    if cert.archived {
        return Err(LifecycleError::Archived(cert.id));
    }
    Ok(())
}

/// Guard for the machine-verification step.
pub fn ensure_verifiable(cert: &Certificate) -> Result<(), LifecycleError> {
    ensure_mutable(cert)?;
    if cert.ml_status != MlStatus::Pending {
        return Err(LifecycleError::InvalidTransition {
            id: cert.id,
            from: cert.ml_status,
            to: MlStatus::Verified,
        });
    }
    Ok(())
}

/// Guard for a faculty decision: machine verified and still awaiting review.
pub fn ensure_decidable(cert: &Certificate) -> Result<(), LifecycleError> {
    ensure_mutable(cert)?;
    if cert.ml_status != MlStatus::Verified || cert.faculty_status != FacultyStatus::Pending {
        return Err(LifecycleError::InvalidState {
            id: cert.id,
            ml: cert.ml_status,
            faculty: cert.faculty_status,
        });
    }
    Ok(())
}
