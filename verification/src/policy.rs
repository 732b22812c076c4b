//! Which evidence links an upload may reference.

use regex::Regex;

use crate::VerificationError;

/// Accepted evidence source unless configured otherwise.
pub const DEFAULT_SOURCE_PATTERN: &str = r"^https://drive\.google\.com/";

/// Validates evidence links against an accepted-source pattern.
#[derive(Clone, Debug)]
pub struct EvidencePolicy {
    pattern: Regex,
}

impl EvidencePolicy {
    pub fn new(pattern: &str) -> Result<Self, VerificationError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn accepts(&self, link: &str) -> bool {
        self.pattern.is_match(link)
    }

    pub fn check(&self, link: &str) -> Result<(), VerificationError> {
        if self.accepts(link) {
            Ok(())
        } else {
            Err(VerificationError::InvalidInput(format!(
                "evidence link {link:?} does not match {}",
                self.pattern()
            )))
        }
    }
}

impl Default for EvidencePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_PATTERN).expect("default source pattern is a valid regex")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accepts_drive_links_only() {
        let policy = EvidencePolicy::default();
        assert!(policy.accepts("https://drive.google.com/file/d/abc/view"));
        assert!(!policy.accepts("http://drive.google.com/file/d/abc"));
        assert!(!policy.accepts("https://drive.google.com.evil.net/x"));
        assert!(!policy.accepts("https://example.com/?https://drive.google.com/"));
    }

    #[test]
    fn custom_pattern() {
        let policy = EvidencePolicy::new(r"^https://(docs|drive)\.example\.edu/").unwrap();
        assert!(policy.check("https://docs.example.edu/cert.pdf").is_ok());
        assert!(matches!(
            policy.check("https://drive.google.com/x"),
            Err(VerificationError::InvalidInput(_))
        ));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        assert!(matches!(
            EvidencePolicy::new("(unclosed"),
            Err(VerificationError::InvalidPattern(_))
        ));
    }
}
