//! Configuration management and validation.
//!
//! Connection settings, request timeout, debug snapshot output and the BQL
//! table grouping strategy used by [`crate::BQuery`].

use crate::constants::{DEFAULT_DEBUG_DIR, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT_MS};
use crate::error::{BbgError, Result};
use crate::parsers::TableGrouping;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings for a [`crate::BQuery`] instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BQueryConfig {
    /// Host of the API endpoint
    pub host: String,

    /// Port of the API endpoint
    pub port: u16,

    /// Wait for each event before the request is declared timed out
    pub timeout_ms: u64,

    /// Write response and parse snapshots to `debug_dir`
    pub debug: bool,

    /// Directory for debug snapshots
    pub debug_dir: PathBuf,

    /// How BQL fields are grouped into tables
    pub grouping: TableGrouping,
}

impl Default for BQueryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            debug: false,
            debug_dir: PathBuf::from(DEFAULT_DEBUG_DIR),
            grouping: TableGrouping::default(),
        }
    }
}

impl BQueryConfig {
    /// Set host and port
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set the per-event timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Enable debug snapshots in the default directory
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Enable debug snapshots in a custom directory
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug = true;
        self.debug_dir = dir.into();
        self
    }

    pub fn with_grouping(mut self, grouping: TableGrouping) -> Self {
        self.grouping = grouping;
        self
    }

    /// Load from a JSON file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BbgError::Configuration {
                message: "Host must not be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(BbgError::Configuration {
                message: "Port must be greater than 0".to_string(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(BbgError::Configuration {
                message: "Timeout must be greater than 0 milliseconds".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BQueryConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8194);
        assert_eq!(config.timeout_ms, 10_000);
        assert!(!config.debug);
        assert_eq!(config.debug_dir, PathBuf::from("debug_cases"));
        assert_eq!(config.grouping, TableGrouping::PerField);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = BQueryConfig::default()
            .with_endpoint("bbg-host", 8195)
            .with_timeout_ms(5000)
            .with_debug_dir("snapshots")
            .with_grouping(TableGrouping::SharedId);

        assert_eq!(config.host, "bbg-host");
        assert_eq!(config.port, 8195);
        assert_eq!(config.timeout_ms, 5000);
        assert!(config.debug);
        assert_eq!(config.debug_dir, PathBuf::from("snapshots"));
        assert_eq!(config.grouping, TableGrouping::SharedId);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(BQueryConfig::default().with_timeout_ms(0).validate().is_err());
        assert!(
            BQueryConfig::default()
                .with_endpoint("localhost", 0)
                .validate()
                .is_err()
        );
        assert!(
            BQueryConfig::default()
                .with_endpoint(" ", 8194)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_from_file_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bquery.json");
        fs::write(&path, r#"{"port": 18194, "grouping": "shared_id"}"#).unwrap();

        let config = BQueryConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 18194);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.grouping, TableGrouping::SharedId);
    }

    #[test]
    fn test_from_file_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bquery.json");
        fs::write(&path, r#"{"timeout_ms": 0}"#).unwrap();

        assert!(matches!(
            BQueryConfig::from_file(&path),
            Err(BbgError::Configuration { .. })
        ));
    }
}
