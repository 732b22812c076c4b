//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use eduvault_store_lmdb::DEFAULT_MAP_SIZE;
use eduvault_utils::LogFormat;
use eduvault_verification::DEFAULT_SOURCE_PATTERN;

use crate::NodeError;

/// Which storage engine backs the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable LMDB environment under `data_dir`.
    Lmdb,
    /// Process-local tables, lost on exit.
    Memory,
}

/// Configuration for an EduVault service.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub lmdb_map_size: usize,

    /// How long the in-memory engine waits for a row lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Regular expression every evidence link must match.
    #[serde(default = "default_source_pattern")]
    pub accepted_source_pattern: String,

    /// Review queue size when the caller does not give one.
    #[serde(default = "default_review_limit")]
    pub pending_review_limit: i64,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_storage() -> StorageBackend {
    StorageBackend::Lmdb
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./eduvault_data")
}

fn default_map_size() -> usize {
    DEFAULT_MAP_SIZE
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_source_pattern() -> String {
    DEFAULT_SOURCE_PATTERN.to_string()
}

fn default_review_limit() -> i64 {
    50
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// An in-memory configuration, handy for tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            data_dir: default_data_dir(),
            lmdb_map_size: default_map_size(),
            lock_timeout_ms: default_lock_timeout_ms(),
            accepted_source_pattern: default_source_pattern(),
            pending_review_limit: default_review_limit(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.storage, config.storage);
        assert_eq!(parsed.accepted_source_pattern, config.accepted_source_pattern);
        assert_eq!(parsed.lmdb_map_size, config.lmdb_map_size);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.storage, StorageBackend::Lmdb);
        assert_eq!(config.pending_review_limit, 50);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            storage = "memory"
            accepted_source_pattern = '^https://files\.example\.edu/'
            log_format = "json"
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.accepted_source_pattern, r"^https://files\.example\.edu/");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let err = NodeConfig::from_toml_str(r#"storage = "postgres""#).unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file(Path::new("/nonexistent/eduvault.toml"));
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
