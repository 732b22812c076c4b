//! EduVault service assembly.
//!
//! Turns a [`NodeConfig`] into a running service:
//! - Opens the configured storage engine (LMDB or in-memory)
//! - Builds the certificate store and the verification workflow on top
//! - Checks the statistics tables against the certificate rows on startup
//! - Serves dashboard aggregates and export lists

pub mod config;
pub mod engine;
pub mod error;
pub mod reports;
pub mod service;

pub use config::{NodeConfig, StorageBackend};
pub use engine::Engine;
pub use error::NodeError;
pub use reports::{
    sanitize_for_file_name, ExportList, ExportScope, Overview, Reports, SectionSummary,
    StudentSummary, Tally,
};
pub use service::EduVaultNode;
