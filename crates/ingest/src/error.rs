//! Error types produced by the ingest crate.
//!
//! Every failure of an ingestion call is terminal: the controller surfaces the
//! first one it reaches and drains the rest of the request body. Coercion never
//! fails, so no variant exists for it.
//!
//! # Error Categories
//!
//! | Error | Category | Suggested status |
//! |-------|----------|------------------|
//! | [`MissingOrInvalidContentType`](IngestError::MissingOrInvalidContentType) | Request shape | 415 |
//! | [`TooManyFields`](IngestError::TooManyFields) | Field limit | 413 |
//! | [`FieldTooLarge`](IngestError::FieldTooLarge) | Field limit | 413 |
//! | [`TooManyFiles`](IngestError::TooManyFiles) | File limit | 413 |
//! | [`FileTooLarge`](IngestError::FileTooLarge) | File limit | 413 |
//! | [`TotalSizeExceeded`](IngestError::TotalSizeExceeded) | File limit | 413 |
//! | [`MalformedMultipart`](IngestError::MalformedMultipart) | Decoding | 400 |
//! | [`UnderlyingStreamError`](IngestError::UnderlyingStreamError) | Transport | 400 |
//!
//! ```rust
//! use ingest::{IngestError, IngestErrorKind};
//!
//! let err = IngestError::FileTooLarge { field: "avatar".into(), max: 1024 };
//! assert_eq!(err.kind(), IngestErrorKind::FileTooLarge);
//! assert!(err.is_limit());
//! assert_eq!(err.http_status_code(), 413);
//! ```
use std::fmt;

use thiserror::Error;

/// Terminal failure of one ingestion call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// The content type is absent or does not declare a multipart boundary.
    ///
    /// Raised before the body stream is touched.
    #[error("missing or invalid multipart content type: {0}")]
    MissingOrInvalidContentType(String),

    /// More text fields arrived than `max_fields` allows.
    #[error("too many fields: limit is {max}")]
    TooManyFields {
        /// Configured field count limit.
        max: usize,
    },

    /// A text field value exceeded `max_field_size`.
    #[error("field '{field}' exceeds size limit of {max} bytes")]
    FieldTooLarge {
        /// Name of the offending field.
        field: String,
        /// Configured per-field limit, in bytes.
        max: usize,
    },

    /// More file parts arrived than `max_files` allows.
    #[error("too many files: limit is {max}")]
    TooManyFiles {
        /// Configured file count limit.
        max: usize,
    },

    /// A single file exceeded `max_file_size`.
    #[error("file in field '{field}' exceeds size limit of {max} bytes")]
    FileTooLarge {
        /// Field name the file was uploaded under.
        field: String,
        /// Configured per-file limit, in bytes.
        max: u64,
    },

    /// The bytes of all files together exceeded `max_total_file_size`.
    #[error("total file size exceeds limit of {max} bytes")]
    TotalSizeExceeded {
        /// Configured aggregate limit, in bytes.
        max: u64,
    },

    /// The decoder reported a structural error (bad framing, truncated body).
    #[error("malformed multipart body: {0}")]
    MalformedMultipart(String),

    /// The transport stream itself failed, e.g. the client disconnected.
    #[error("request body stream failed: {0}")]
    UnderlyingStreamError(String),
}

/// Fieldless discriminant of [`IngestError`], handy for logs and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestErrorKind {
    MissingOrInvalidContentType,
    TooManyFields,
    FieldTooLarge,
    TooManyFiles,
    FileTooLarge,
    TotalSizeExceeded,
    MalformedMultipart,
    UnderlyingStreamError,
}

impl IngestErrorKind {
    /// Stable snake_case label.
    pub fn as_str(self) -> &'static str {
        match self {
            IngestErrorKind::MissingOrInvalidContentType => "missing_or_invalid_content_type",
            IngestErrorKind::TooManyFields => "too_many_fields",
            IngestErrorKind::FieldTooLarge => "field_too_large",
            IngestErrorKind::TooManyFiles => "too_many_files",
            IngestErrorKind::FileTooLarge => "file_too_large",
            IngestErrorKind::TotalSizeExceeded => "total_size_exceeded",
            IngestErrorKind::MalformedMultipart => "malformed_multipart",
            IngestErrorKind::UnderlyingStreamError => "underlying_stream_error",
        }
    }
}

impl fmt::Display for IngestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IngestError {
    /// Returns the fieldless kind of this error.
    pub fn kind(&self) -> IngestErrorKind {
        match self {
            IngestError::MissingOrInvalidContentType(_) => {
                IngestErrorKind::MissingOrInvalidContentType
            }
            IngestError::TooManyFields { .. } => IngestErrorKind::TooManyFields,
            IngestError::FieldTooLarge { .. } => IngestErrorKind::FieldTooLarge,
            IngestError::TooManyFiles { .. } => IngestErrorKind::TooManyFiles,
            IngestError::FileTooLarge { .. } => IngestErrorKind::FileTooLarge,
            IngestError::TotalSizeExceeded { .. } => IngestErrorKind::TotalSizeExceeded,
            IngestError::MalformedMultipart(_) => IngestErrorKind::MalformedMultipart,
            IngestError::UnderlyingStreamError(_) => IngestErrorKind::UnderlyingStreamError,
        }
    }

    /// Returns true when a configured count or size limit was exceeded.
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            IngestError::TooManyFields { .. }
                | IngestError::FieldTooLarge { .. }
                | IngestError::TooManyFiles { .. }
                | IngestError::FileTooLarge { .. }
                | IngestError::TotalSizeExceeded { .. }
        )
    }

    /// Returns a suggested HTTP status code for this error.
    ///
    /// - content type problems: 415
    /// - limit violations: 413
    /// - everything else: 400
    pub fn http_status_code(&self) -> u16 {
        match self {
            IngestError::MissingOrInvalidContentType(_) => 415,
            _ if self.is_limit() => 413,
            _ => 400,
        }
    }
}
