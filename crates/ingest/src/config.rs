//! Configuration types for multipart ingestion.
//!
//! [`IngestConfig`] carries every limit and coercion switch consulted while a
//! request body is ingested. One value is built per call (usually cloned from
//! a process-wide default) and never mutated while the call runs.
//!
//! # Quick Start
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("default configuration is valid");
//! assert_eq!(config.max_files, 10);
//! ```
//!
//! # Overriding Limits
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig {
//!     max_file_size: 1024,
//!     max_total_file_size: Some(4096),
//!     auto_parse_json: false,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default per-file byte limit (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of file parts accepted per request.
pub const DEFAULT_MAX_FILES: usize = 10;

/// Default number of text fields accepted per request.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// Default per-field byte limit (64 KiB).
pub const DEFAULT_MAX_FIELD_SIZE: usize = 64 * 1024;

/// Runtime configuration for one ingestion call.
///
/// Every field has a default, so partial configuration documents deserialize
/// cleanly:
///
/// ```json
/// {
///   "max_file_size": 1048576,
///   "max_files": 4,
///   "max_total_file_size": 2097152,
///   "auto_parse_numbers": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum bytes accepted for any single file part.
    ///
    /// A file of exactly this many bytes is accepted; one more byte fails the
    /// call with [`IngestError::FileTooLarge`](crate::IngestError::FileTooLarge).
    ///
    /// Default: 10 MiB
    pub max_file_size: u64,

    /// Maximum number of file parts.
    ///
    /// Default: `10`
    pub max_files: usize,

    /// Maximum number of text fields.
    ///
    /// Default: `100`
    pub max_fields: usize,

    /// Maximum bytes accepted for any single text field value.
    ///
    /// Default: 64 KiB
    pub max_field_size: usize,

    /// Maximum bytes accepted across all file parts of one request.
    ///
    /// Default: `None` (unbounded)
    pub max_total_file_size: Option<u64>,

    /// Parse `{...}` / `[...]` field values as JSON.
    ///
    /// Default: `true`
    pub auto_parse_json: bool,

    /// Parse numeric field values as numbers.
    ///
    /// Default: `true`
    pub auto_parse_numbers: bool,

    /// Parse the literals `true` / `false` as booleans.
    ///
    /// Default: `true`
    pub auto_parse_booleans: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            max_fields: DEFAULT_MAX_FIELDS,
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
            max_total_file_size: None,
            auto_parse_json: true,
            auto_parse_numbers: true,
            auto_parse_booleans: true,
        }
    }
}

/// Errors raised when validating an [`IngestConfig`].
///
/// These are start-up problems; surface them before serving traffic.
///
/// ```rust
/// use ingest::{ConfigError, IngestConfig};
///
/// let config = IngestConfig {
///     max_file_size: 2048,
///     max_total_file_size: Some(1024),
///     ..Default::default()
/// };
///
/// assert_eq!(
///     config.validate(),
///     Err(ConfigError::TotalBelowPerFile { total: 1024, per_file: 2048 })
/// );
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The aggregate file limit is smaller than the per-file limit, which
    /// makes the per-file limit unreachable.
    #[error(
        "max_total_file_size ({total}) is smaller than max_file_size ({per_file}); \
         the aggregate limit must admit at least one full-size file"
    )]
    TotalBelowPerFile {
        /// Configured aggregate limit, in bytes.
        total: u64,
        /// Configured per-file limit, in bytes.
        per_file: u64,
    },
}

impl IngestConfig {
    /// Checks the configuration for internally inconsistent limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(total) = self.max_total_file_size {
            if total < self.max_file_size {
                return Err(ConfigError::TotalBelowPerFile {
                    total,
                    per_file: self.max_file_size,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let cfg = IngestConfig::default();
        assert_eq!(cfg.max_file_size, 10 * 1024 * 1024);
        assert_eq!(cfg.max_files, 10);
        assert_eq!(cfg.max_fields, 100);
        assert_eq!(cfg.max_field_size, 64 * 1024);
        assert!(cfg.max_total_file_size.is_none());
        assert!(cfg.auto_parse_json);
        assert!(cfg.auto_parse_numbers);
        assert!(cfg.auto_parse_booleans);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let cfg: IngestConfig =
            serde_json::from_str(r#"{"max_files": 2, "auto_parse_booleans": false}"#)
                .expect("config should deserialize");
        assert_eq!(cfg.max_files, 2);
        assert!(!cfg.auto_parse_booleans);
        assert_eq!(cfg.max_fields, DEFAULT_MAX_FIELDS);
        assert_eq!(cfg.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn validate_rejects_total_below_per_file() {
        let cfg = IngestConfig {
            max_file_size: 100,
            max_total_file_size: Some(99),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::TotalBelowPerFile { total: 99, per_file: 100 })
        ));
    }

    #[test]
    fn validate_accepts_equal_limits() {
        let cfg = IngestConfig {
            max_file_size: 100,
            max_total_file_size: Some(100),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
