//! Formpipe Ingest Layer
//!
//! This is where a `multipart/form-data` request body becomes something the
//! rest of a service can use. We take the raw byte stream plus its content
//! type, decode it part by part, and hand back a [`ParsedPayload`]: an
//! insertion-ordered map of field names to typed values and buffered files.
//!
//! ## What we do here
//!
//! - **Enforce limits while streaming** - field count, field size, file count,
//!   per-file size and aggregate file size are checked as bytes arrive, never
//!   after the fact.
//! - **Coerce text fields** - JSON objects/arrays, then `true`/`false`, then
//!   numbers, with the original string as the fallback. See [`coerce`].
//! - **Aggregate repeated names** - a name seen twice becomes an ordered list.
//! - **Always drain** - after the first failure the rest of the body is still
//!   read to its end so the connection is never left stalled.
//! - **Log everything** - one `ingest.multipart` span per call via tracing.
//!
//! ## Main entry point
//!
//! Call [`ingest`] with a body stream, the request's content type and an
//! [`IngestConfig`]. Errors are typed ([`IngestError`]) and exactly one
//! outcome is produced per call.
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use futures::stream;
//! use ingest::{ingest, IngestConfig};
//!
//! let body = concat!(
//!     "--b\r\n",
//!     "Content-Disposition: form-data; name=\"age\"\r\n\r\n",
//!     "25\r\n",
//!     "--b--\r\n",
//! );
//! let chunks = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(body))]);
//!
//! let payload = futures::executor::block_on(ingest(
//!     chunks,
//!     Some("multipart/form-data; boundary=b"),
//!     &IngestConfig::default(),
//! ))
//! .unwrap();
//!
//! let age = payload.get("age").and_then(|entry| entry.first());
//! assert_eq!(age.and_then(|value| value.as_f64()), Some(25.0));
//! ```
//!
use std::time::Instant;

use bytes::Bytes;
use futures::Stream;
use tracing::{info, warn, Instrument, Level};

mod coerce;
mod config;
mod controller;
mod decoder;
mod error;
mod limits;
mod payload;
mod types;

pub use crate::coerce::coerce;
pub use crate::config::{
    ConfigError, IngestConfig, DEFAULT_MAX_FIELDS, DEFAULT_MAX_FIELD_SIZE, DEFAULT_MAX_FILES,
    DEFAULT_MAX_FILE_SIZE,
};
pub use crate::controller::{ControllerState, IngestController, IngestStats};
pub use crate::decoder::{
    parse_boundary, DecodeError, DecoderEvent, FileBody, MulterFileBody, MulterSource, PartSource,
};
pub use crate::error::{IngestError, IngestErrorKind};
pub use crate::limits::{FileTally, LimitEnforcer, LimitKind};
pub use crate::payload::{FieldEntry, ParsedPayload};
pub use crate::types::{FileInfo, ParsedFile, ParsedValue};

/// Ingest a multipart body: checks the content type, decodes every part under
/// the configured limits, and returns the normalized payload.
///
/// The content type is checked before `body` is polled; a missing or
/// non-multipart type fails with
/// [`IngestError::MissingOrInvalidContentType`] and leaves the stream untouched.
pub async fn ingest<S, O, E>(
    body: S,
    content_type: Option<&str>,
    cfg: &IngestConfig,
) -> Result<ParsedPayload, IngestError>
where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let boundary = match parse_boundary(content_type) {
        Ok(boundary) => boundary,
        Err(err) => {
            warn!(error = %err, content_type = ?content_type, "ingest_failure");
            return Err(err);
        }
    };

    let mut source = MulterSource::new(body, boundary, cfg.max_field_size);
    ingest_source(&mut source, cfg).await
}

/// Runs ingestion over an already constructed [`PartSource`].
///
/// Use this to plug in a decoder other than `multer`.
pub async fn ingest_source<S: PartSource>(
    source: &mut S,
    cfg: &IngestConfig,
) -> Result<ParsedPayload, IngestError> {
    let span = tracing::span!(
        Level::INFO,
        "ingest.multipart",
        max_files = cfg.max_files,
        max_fields = cfg.max_fields,
        max_file_size = cfg.max_file_size
    );

    async move {
        let start = Instant::now();
        let mut controller = IngestController::new(cfg);
        let result = controller.run(source).await;
        let stats = controller.stats();
        let elapsed_micros = start.elapsed().as_micros();

        match &result {
            Ok(payload) => info!(
                keys = payload.len(),
                fields = stats.fields,
                files = stats.files,
                total_file_bytes = stats.total_file_bytes,
                elapsed_micros,
                "ingest_success"
            ),
            Err(err) => warn!(
                error = %err,
                kind = %err.kind(),
                fields = stats.fields,
                files = stats.files,
                drained_bytes = stats.drained_bytes,
                elapsed_micros,
                "ingest_failure"
            ),
        }
        result
    }
    .instrument(span)
    .await
}
