//! Pluggable machine verification.
//!
//! The workflow only requires that a certificate receives a confidence score
//! before faculty review. How the score is produced is up to the method.

use eduvault_types::Certificate;

/// Confidence given by [`FixedScore`] when built with `Default`.
pub const FIXED_CONFIDENCE: f64 = 95.0;

/// A machine verification method.
pub trait VerificationMethod: Send + Sync {
    /// Human-readable name of this method.
    fn name(&self) -> &str;

    /// Score the certificate's evidence, 0 to 100.
    fn assess(&self, cert: &Certificate) -> VerificationAssessment;
}

/// The result of a method's assessment.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationAssessment {
    pub score: f64,
    pub method: String,
}

/// Gives every certificate the same score.
#[derive(Clone, Debug)]
pub struct FixedScore {
    score: f64,
}

impl FixedScore {
    pub fn new(score: f64) -> Self {
        Self { score }
    }
}

impl Default for FixedScore {
    fn default() -> Self {
        Self::new(FIXED_CONFIDENCE)
    }
}

impl VerificationMethod for FixedScore {
    fn name(&self) -> &str {
        "fixed-score"
    }

    fn assess(&self, _cert: &Certificate) -> VerificationAssessment {
        VerificationAssessment {
            score: self.score,
            method: self.name().to_string(),
        }
    }
}
