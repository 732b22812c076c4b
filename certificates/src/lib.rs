//! Certificate store.
//!
//! Owns the certificate rows. Every mutation runs in a single write
//! transaction that also applies the matching statistics deltas, so a
//! certificate and the counters it feeds are always committed together.

pub mod error;
pub mod query;
pub mod store;

pub use error::CertificateError;
pub use query::DEFAULT_REVIEW_LIMIT;
pub use store::CertificateStore;
