//! Certificate identifiers.

use blake2::digest::consts::U16;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;
use crate::time::Timestamp;

type Blake2b128 = Blake2b<U16>;

/// A 16-byte certificate identifier, rendered as 32 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CertificateId([u8; 16]);

impl CertificateId {
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Derive the identifier of a new certificate.
    ///
    /// `sequence` is the engine-assigned insertion number, which makes the id
    /// unique even when the same evidence is uploaded twice in one second.
    pub fn derive(
        evidence_link: &str,
        register_number: &str,
        uploaded_at: Timestamp,
        sequence: u64,
    ) -> Self {
        let mut hasher = Blake2b128::new();
        hasher.update(evidence_link.as_bytes());
        hasher.update([0u8]);
        hasher.update(register_number.as_bytes());
        hasher.update([0u8]);
        hasher.update(uploaded_at.as_secs().to_be_bytes());
        hasher.update(sequence.to_be_bytes());
        let mut out = [0u8; 16];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertificateId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for CertificateId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 16];
        hex::decode_to_slice(s.trim(), &mut out)
            .map_err(|_| TypesError::InvalidCertificateId(s.to_string()))?;
        Ok(Self(out))
    }
}

impl Serialize for CertificateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CertificateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_depends_on_sequence() {
        let at = Timestamp::new(1_700_000_000);
        let a = CertificateId::derive("https://drive.google.com/a", "RA1", at, 1);
        let b = CertificateId::derive("https://drive.google.com/a", "RA1", at, 2);
        assert_ne!(a, b);
        assert_eq!(a, CertificateId::derive("https://drive.google.com/a", "RA1", at, 1));
    }

    #[test]
    fn parses_its_display_form() {
        let id = CertificateId::new([0xab; 16]);
        let parsed: CertificateId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("not-an-id".parse::<CertificateId>().is_err());
        assert!("abcd".parse::<CertificateId>().is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = CertificateId::new([1; 16]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(16)));
    }
}
