//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies (clock, storage, background execution) sit behind
//! traits. This crate provides implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! [`NullStore`] doubles as the in-memory storage engine used when no data
//! directory is configured.

pub mod clock;
pub mod runner;
pub mod store;

pub use clock::NullClock;
pub use runner::NullTaskRunner;
pub use store::NullStore;
