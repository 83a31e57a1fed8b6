//! The ingestion state machine.
//!
//! ```text
//!            first failure
//! Running ─────────────────► Failed(err)
//!    │                          │  further events inert, file bodies drained,
//!    │ Finish                   │  later failures suppressed
//!    ▼                          ▼
//! Finished                  Err(err) once the source is exhausted
//! ```
//!
//! Every file body handed over by the source is read to its end on every
//! path, so the transport stream underneath is always fully consumed.
use bytes::BytesMut;
use tracing::debug;

use crate::coerce::coerce;
use crate::config::IngestConfig;
use crate::decoder::{DecodeError, DecoderEvent, FileBody, PartSource};
use crate::error::IngestError;
use crate::limits::LimitEnforcer;
use crate::payload::ParsedPayload;
use crate::types::{FileInfo, ParsedFile, ParsedValue};

/// Where one ingestion call currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Running,
    /// The first failure reached; it is the call's outcome.
    Failed(IngestError),
    Finished,
}

/// Running totals reported once an ingestion call ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub fields: usize,
    pub files: usize,
    pub total_file_bytes: u64,
    /// Bytes read and discarded after a failure.
    pub drained_bytes: u64,
}

/// Drives one ingestion call over a [`PartSource`].
#[derive(Debug)]
pub struct IngestController<'a> {
    cfg: &'a IngestConfig,
    limits: LimitEnforcer,
    payload: ParsedPayload,
    state: ControllerState,
    drained_bytes: u64,
}

impl<'a> IngestController<'a> {
    pub fn new(cfg: &'a IngestConfig) -> Self {
        Self {
            cfg,
            limits: LimitEnforcer::new(cfg),
            payload: ParsedPayload::new(),
            state: ControllerState::Running,
            drained_bytes: 0,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            fields: self.limits.fields(),
            files: self.limits.files(),
            total_file_bytes: self.limits.total_file_bytes(),
            drained_bytes: self.drained_bytes,
        }
    }

    /// Consumes `source` until its terminal event and settles the outcome.
    pub async fn run<S: PartSource>(&mut self, source: &mut S) -> Result<ParsedPayload, IngestError> {
        loop {
            match source.next_event().await {
                DecoderEvent::Field {
                    name,
                    value,
                    raw_len,
                    truncated,
                } => self.on_field(name, value, raw_len, truncated),
                DecoderEvent::File { name, body, info } => self.on_file(name, body, info).await,
                DecoderEvent::Limit(kind) => {
                    let err = self.limits.classify(&kind);
                    self.fail(err);
                }
                DecoderEvent::Error(err) => {
                    let err = self.decode_failure(err);
                    self.fail(err);
                    break;
                }
                DecoderEvent::Finish => break,
            }
        }
        self.settle()
    }

    fn on_field(&mut self, name: String, value: String, raw_len: usize, truncated: bool) {
        if !self.is_running() {
            return;
        }
        if let Err(err) = self.limits.admit_field(&name, raw_len, truncated) {
            self.fail(err);
            return;
        }
        let parsed = coerce(&value, self.cfg);
        debug!(field = %name, bytes = raw_len, value_type = parsed.type_name(), "field_accepted");
        self.payload.put(name, parsed);
    }

    async fn on_file<B: FileBody>(&mut self, name: String, mut body: B, info: FileInfo) {
        if !self.is_running() {
            self.drain(&mut body).await;
            return;
        }

        let mut tally = match self.limits.admit_file(&name) {
            Ok(tally) => tally,
            Err(err) => {
                self.fail(err);
                self.drain(&mut body).await;
                return;
            }
        };

        let mut buffer = BytesMut::new();
        loop {
            match body.next_chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(err) = self.limits.record_chunk(&mut tally, chunk.len()) {
                        self.fail(err);
                        self.drain(&mut body).await;
                        return;
                    }
                    buffer.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(err) => {
                    // The source reports the same failure as its next event.
                    let err = self.decode_failure(err);
                    self.fail(err);
                    return;
                }
            }
        }

        debug!(field = tally.field(), bytes = tally.bytes(), "file_buffered");
        let file = ParsedFile::new(name.clone(), info, buffer.freeze());
        self.payload.put(name, ParsedValue::File(file));
    }

    /// Reads `body` to its end without retaining anything.
    async fn drain<B: FileBody>(&mut self, body: &mut B) {
        let mut drained = 0u64;
        loop {
            match body.next_chunk().await {
                Ok(Some(chunk)) => drained += chunk.len() as u64,
                Ok(None) => break,
                Err(err) => {
                    debug!(error = ?err, drained, "drain_aborted");
                    break;
                }
            }
        }
        debug!(drained, "file_body_drained");
        self.drained_bytes += drained;
    }

    fn decode_failure(&self, err: DecodeError) -> IngestError {
        match err {
            DecodeError::Malformed(detail) => IngestError::MalformedMultipart(detail),
            DecodeError::Transport(detail) => IngestError::UnderlyingStreamError(detail),
            DecodeError::Limit(kind) => self.limits.classify(&kind),
        }
    }

    fn fail(&mut self, err: IngestError) {
        if let ControllerState::Failed(first) = &self.state {
            debug!(first = %first, suppressed = %err, "ingest_failure_suppressed");
            return;
        }
        if self.is_running() {
            self.state = ControllerState::Failed(err);
        }
    }

    fn is_running(&self) -> bool {
        matches!(self.state, ControllerState::Running)
    }

    fn settle(&mut self) -> Result<ParsedPayload, IngestError> {
        if let ControllerState::Failed(err) = &self.state {
            let err = err.clone();
            self.payload = ParsedPayload::new();
            return Err(err);
        }
        self.state = ControllerState::Finished;
        Ok(std::mem::take(&mut self.payload))
    }
}
