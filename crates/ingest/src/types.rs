//! Core data model types for the ingest crate.
//!
//! ```text
//! multipart part
//! ├── text field ──coerce()──► ParsedValue::{String, Number, Boolean, Json}
//! └── file part  ──buffer───► ParsedValue::File(ParsedFile)
//!
//!         ↓ Field Aggregator
//!
//! ParsedPayload (name → single value | ordered list)
//! ```
use std::fmt;

use bytes::Bytes;
use serde::{Serialize, Serializer};

/// Declared metadata of a file part, as reported by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// Original filename from `Content-Disposition` (may be empty).
    pub filename: String,
    /// Declared transfer encoding (`7bit` when the part declares none).
    pub encoding: String,
    /// Declared MIME type (`text/plain` when the part declares none).
    pub mime_type: String,
}

/// A fully buffered file part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFile {
    /// Form field name the file was uploaded under.
    pub field_name: String,
    /// Original filename supplied by the client.
    pub filename: String,
    /// Declared transfer encoding.
    pub encoding: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Number of bytes received.
    pub size: u64,
    #[serde(skip)]
    data: Bytes,
}

impl ParsedFile {
    /// Builds a file from its metadata and buffered content.
    pub fn new(field_name: impl Into<String>, info: FileInfo, data: Bytes) -> Self {
        Self {
            field_name: field_name.into(),
            filename: info.filename,
            encoding: info.encoding,
            mime_type: info.mime_type,
            size: data.len() as u64,
            data,
        }
    }

    /// Number of bytes received.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Borrow the buffered content.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Take ownership of the buffered content.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// File extension from the original filename, if any.
    pub fn extension(&self) -> Option<&str> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

/// A normalized field value.
///
/// Serializes untagged: strings, numbers, booleans and JSON values as
/// themselves, files as their metadata object. Integral numbers within the
/// exactly representable range serialize as integers, non-finite ones as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParsedValue {
    String(String),
    Number(#[serde(serialize_with = "serialize_number")] f64),
    Boolean(bool),
    Json(serde_json::Value),
    File(ParsedFile),
}

impl ParsedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParsedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParsedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParsedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ParsedValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&ParsedFile> {
        match self {
            ParsedValue::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, ParsedValue::File(_))
    }

    /// Short label of the variant, used in logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParsedValue::String(_) => "string",
            ParsedValue::Number(_) => "number",
            ParsedValue::Boolean(_) => "boolean",
            ParsedValue::Json(_) => "json",
            ParsedValue::File(_) => "file",
        }
    }
}

/// Largest magnitude below which every integer is exact in an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn serialize_number<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*n as i64)
    } else {
        serializer.serialize_f64(*n)
    }
}

/// Renders the value so that coercing the output again yields the same value.
impl fmt::Display for ParsedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedValue::String(s) => f.write_str(s),
            ParsedValue::Number(n) => fmt_number(*n, f),
            ParsedValue::Boolean(b) => write!(f, "{b}"),
            ParsedValue::Json(v) => write!(f, "{v}"),
            ParsedValue::File(file) => f.write_str(&file.filename),
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n == f64::INFINITY {
        f.write_str("Infinity")
    } else if n == f64::NEG_INFINITY {
        f.write_str("-Infinity")
    } else {
        // f64's Display is the shortest round-tripping decimal, without exponent.
        write!(f, "{n}")
    }
}

impl From<ParsedFile> for ParsedValue {
    fn from(file: ParsedFile) -> Self {
        ParsedValue::File(file)
    }
}
