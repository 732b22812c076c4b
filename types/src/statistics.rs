//! Aggregate statistics rows, keyed by student register number and by section.

use serde::{Deserialize, Serialize};
use std::ops::Add;

use crate::status::FacultyDecision;
use crate::time::Timestamp;

/// Running certificate totals shared by both statistics tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub total_uploaded: u64,
    pub legit: u64,
    pub not_legit: u64,
    pub pending: u64,
    pub ml_verified: u64,
}

impl Counters {
    /// Apply a signed delta counter-wise. `None` if any counter would go negative.
    pub fn apply(&self, delta: &CounterDelta) -> Option<Counters> {
        Some(Counters {
            total_uploaded: self.total_uploaded.checked_add_signed(delta.total_uploaded)?,
            legit: self.legit.checked_add_signed(delta.legit)?,
            not_legit: self.not_legit.checked_add_signed(delta.not_legit)?,
            pending: self.pending.checked_add_signed(delta.pending)?,
            ml_verified: self.ml_verified.checked_add_signed(delta.ml_verified)?,
        })
    }
}

/// A signed change to [`Counters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub total_uploaded: i64,
    pub legit: i64,
    pub not_legit: i64,
    pub pending: i64,
    pub ml_verified: i64,
}

impl CounterDelta {
    pub const ZERO: Self = Self {
        total_uploaded: 0,
        legit: 0,
        not_legit: 0,
        pending: 0,
        ml_verified: 0,
    };

    /// A new certificate was stored.
    pub const UPLOADED: Self = Self {
        total_uploaded: 1,
        pending: 1,
        ..Self::ZERO
    };

    /// Machine status moved from pending to verified.
    pub const ML_VERIFIED: Self = Self {
        ml_verified: 1,
        ..Self::ZERO
    };

    /// Effect of a first faculty decision on the student row.
    pub fn student_decision(decision: FacultyDecision) -> Self {
        match decision {
            FacultyDecision::Legit => Self {
                legit: 1,
                pending: -1,
                ..Self::ZERO
            },
            FacultyDecision::NotLegit => Self {
                not_legit: 1,
                pending: -1,
                ..Self::ZERO
            },
        }
    }

    /// Effect of a first faculty decision on the section row.
    ///
    /// Sections do not track rejections.
    pub fn section_decision(decision: FacultyDecision) -> Self {
        match decision {
            FacultyDecision::Legit => Self {
                legit: 1,
                pending: -1,
                ..Self::ZERO
            },
            FacultyDecision::NotLegit => Self {
                pending: -1,
                ..Self::ZERO
            },
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Add for CounterDelta {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            total_uploaded: self.total_uploaded + rhs.total_uploaded,
            legit: self.legit + rhs.legit,
            not_legit: self.not_legit + rhs.not_legit,
            pending: self.pending + rhs.pending,
            ml_verified: self.ml_verified + rhs.ml_verified,
        }
    }
}

/// Per-student aggregate row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentStatistics {
    pub register_number: String,
    pub counters: Counters,
    pub last_updated: Timestamp,
}

impl StudentStatistics {
    pub fn new(register_number: impl Into<String>, at: Timestamp) -> Self {
        Self {
            register_number: register_number.into(),
            counters: Counters::default(),
            last_updated: at,
        }
    }
}

/// Per-section aggregate row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStatistics {
    pub section: String,
    pub counters: Counters,
    pub last_updated: Timestamp,
}

impl SectionStatistics {
    pub fn new(section: impl Into<String>, at: Timestamp) -> Self {
        Self {
            section: section.into(),
            counters: Counters::default(),
            last_updated: at,
        }
    }
}
