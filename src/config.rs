//! YAML configuration file support for Formpipe.
//!
//! Lets applications keep their ingestion limits next to the rest of their
//! deployment configuration and load them at startup.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # Formpipe configuration
//! version: "1.0"
//! name: "uploads"
//!
//! ingest:
//!   max_file_size: 5242880
//!   max_files: 4
//!   max_fields: 50
//!   max_field_size: 16384
//!   max_total_file_size: 10485760
//!   auto_parse_json: true
//!   auto_parse_numbers: true
//!   auto_parse_booleans: false
//! ```
//!
//! Every `ingest` key is optional; missing keys take the library defaults.

use std::fs;
use std::path::Path;

use ingest::{ConfigError, IngestConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(#[from] ConfigError),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FormpipeConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Ingestion limits and coercion switches
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl FormpipeConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FormpipeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        self.ingest.validate()?;
        Ok(())
    }
}

impl Default for FormpipeConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            ingest: IngestConfig::default(),
        }
    }
}
