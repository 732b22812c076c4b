//! LMDB storage engine for EduVault.
//!
//! Implements the `eduvault-store` traits using the `heed` LMDB bindings.
//! Each table maps to one named database within a single environment;
//! values are bincode-encoded.

pub mod environment;
pub mod error;
pub mod txn;

pub use environment::{LmdbEnvironment, DEFAULT_MAP_SIZE};
pub use error::LmdbError;
