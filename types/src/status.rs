//! Status enums for the two verification stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Outcome of the automated (simulated) evidence inspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MlStatus {
    Pending,
    Verified,
    Duplicate,
}

impl MlStatus {
    /// Pending moves to `Verified` or `Duplicate`; `Verified` only accepts a
    /// new score; `Duplicate` is absorbing.
    pub fn can_become(&self, next: MlStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Verified)
                | (Self::Pending, Self::Duplicate)
                | (Self::Verified, Self::Verified)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::Duplicate => "DUPLICATE",
        }
    }
}

impl fmt::Display for MlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human reviewer outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacultyStatus {
    Pending,
    Legit,
    NotLegit,
}

impl FacultyStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Legit => "LEGIT",
            Self::NotLegit => "NOT_LEGIT",
        }
    }
}

impl fmt::Display for FacultyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacultyStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "PENDING" => Ok(Self::Pending),
            "LEGIT" => Ok(Self::Legit),
            "NOT_LEGIT" => Ok(Self::NotLegit),
            _ => Err(TypesError::UnknownStatus(s.to_string())),
        }
    }
}

/// A terminal faculty decision. `Pending` is not a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacultyDecision {
    Legit,
    NotLegit,
}

impl From<FacultyDecision> for FacultyStatus {
    fn from(d: FacultyDecision) -> Self {
        match d {
            FacultyDecision::Legit => FacultyStatus::Legit,
            FacultyDecision::NotLegit => FacultyStatus::NotLegit,
        }
    }
}

impl TryFrom<FacultyStatus> for FacultyDecision {
    type Error = TypesError;

    fn try_from(status: FacultyStatus) -> Result<Self, Self::Error> {
        match status {
            FacultyStatus::Legit => Ok(Self::Legit),
            FacultyStatus::NotLegit => Ok(Self::NotLegit),
            FacultyStatus::Pending => Err(TypesError::NotADecision(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_status_is_monotonic() {
        assert!(MlStatus::Pending.can_become(MlStatus::Verified));
        assert!(MlStatus::Pending.can_become(MlStatus::Duplicate));
        assert!(MlStatus::Verified.can_become(MlStatus::Verified));
        assert!(!MlStatus::Pending.can_become(MlStatus::Pending));
        assert!(!MlStatus::Verified.can_become(MlStatus::Pending));
        assert!(!MlStatus::Verified.can_become(MlStatus::Duplicate));
        assert!(!MlStatus::Duplicate.can_become(MlStatus::Verified));
        assert!(!MlStatus::Duplicate.can_become(MlStatus::Duplicate));
    }

    #[test]
    fn pending_is_not_a_decision() {
        assert!(FacultyDecision::try_from(FacultyStatus::Pending).is_err());
        assert_eq!(
            FacultyDecision::try_from(FacultyStatus::NotLegit).unwrap(),
            FacultyDecision::NotLegit
        );
    }

    #[test]
    fn parses_wire_spellings() {
        assert_eq!("legit".parse::<FacultyStatus>().unwrap(), FacultyStatus::Legit);
        assert_eq!("not-legit".parse::<FacultyStatus>().unwrap(), FacultyStatus::NotLegit);
        assert_eq!("NOT_LEGIT".parse::<FacultyStatus>().unwrap(), FacultyStatus::NotLegit);
        assert!("maybe".parse::<FacultyStatus>().is_err());
    }
}
