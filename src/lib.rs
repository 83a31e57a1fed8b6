//! Workspace umbrella crate for Formpipe.
//!
//! This crate re-exports the multipart ingestion core and adds the pieces a
//! host application usually wants on top of it: an in-memory entry point,
//! YAML configuration loading and a process-wide metrics observer.

pub mod config;

pub use config::{ConfigLoadError, FormpipeConfig};
pub use ingest::{
    ConfigError, ControllerState, DecodeError, DecoderEvent, FieldEntry, FileBody, FileInfo,
    IngestConfig, IngestController, IngestError, IngestErrorKind, IngestStats, MulterSource,
    ParsedFile, ParsedPayload, ParsedValue, PartSource, coerce, ingest, ingest_source,
    parse_boundary,
};

use bytes::Bytes;
use futures::Stream;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Metrics observer for ingestion calls.
pub trait IngestMetrics: Send + Sync {
    fn record_ingest(&self, latency: Duration, result: Result<(), IngestError>);
}

/// Install or clear the global ingestion metrics recorder.
pub fn set_ingest_metrics(recorder: Option<Arc<dyn IngestMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let installed = recorder.is_some();
    *guard = recorder;
    debug!(installed, "ingest_metrics_recorder_updated");
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn IngestMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn IngestMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn IngestMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn IngestMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_ingest(self, result: &Result<ParsedPayload, IngestError>) {
        let outcome = match result {
            Ok(_) => Ok(()),
            Err(err) => Err(err.clone()),
        };
        self.recorder.record_ingest(self.start.elapsed(), outcome);
    }
}

/// Same as [`ingest`], additionally reporting the outcome to the installed
/// [`IngestMetrics`] recorder.
pub async fn ingest_stream<S, O, E>(
    body: S,
    content_type: Option<&str>,
    cfg: &IngestConfig,
) -> Result<ParsedPayload, IngestError>
where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let span = MetricsSpan::start();
    let result = ingest::ingest(body, content_type, cfg).await;
    if let Some(span) = span {
        span.record_ingest(&result);
    }
    result
}

/// Ingest a multipart body that is already fully in memory.
pub async fn ingest_bytes(
    body: impl Into<Bytes>,
    content_type: Option<&str>,
    cfg: &IngestConfig,
) -> Result<ParsedPayload, IngestError> {
    let chunk: Result<Bytes, std::convert::Infallible> = Ok(body.into());
    ingest_stream(futures::stream::once(async move { chunk }), content_type, cfg).await
}

/// Ingest an in-memory body with the default configuration.
pub async fn ingest_bytes_default(
    body: impl Into<Bytes>,
    content_type: Option<&str>,
) -> Result<ParsedPayload, IngestError> {
    ingest_bytes(body, content_type, &IngestConfig::default()).await
}
