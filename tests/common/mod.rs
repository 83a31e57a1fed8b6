//! Common utilities for Formpipe integration tests
//!
//! Builds multipart bodies by hand and wraps them in streams that record how
//! far the decoder read.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use futures::stream;

pub const BOUNDARY: &str = "----formpipe-test-boundary";

pub fn content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Incrementally assembled `multipart/form-data` body.
#[derive(Default)]
pub struct FormBody {
    buf: Vec<u8>,
}

impl FormBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(self, name: &str, value: &str) -> Self {
        self.raw_field(name, value.as_bytes())
    }

    /// Text part whose value need not be valid UTF-8.
    pub fn raw_field(mut self, name: &str, value: &[u8]) -> Self {
        self.open_part();
        self.buf.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.buf.extend_from_slice(value);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, mime: &str, content: &[u8]) -> Self {
        self.open_part();
        self.buf.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(content);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.buf
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.buf
    }

    fn open_part(&mut self) {
        self.buf
            .extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    }
}

/// Splits `body` into `chunk_size` pieces and counts how many were pulled.
pub fn counting_stream(
    body: Vec<u8>,
    chunk_size: usize,
) -> (
    impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
    Arc<AtomicUsize>,
    usize,
) {
    let chunks: Vec<Bytes> = body
        .chunks(chunk_size)
        .map(Bytes::copy_from_slice)
        .collect();
    let total = chunks.len();
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = pulled.clone();
    let stream = stream::iter(chunks).map(move |chunk| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(chunk)
    });
    (stream, pulled, total)
}

/// Yields `body` in chunks, then fails as if the client disconnected.
pub fn failing_stream(
    body: Vec<u8>,
    chunk_size: usize,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
    let mut items: Vec<Result<Bytes, io::Error>> = body
        .chunks(chunk_size)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    items.push(Err(io::Error::new(
        io::ErrorKind::ConnectionReset,
        "client disconnected",
    )));
    stream::iter(items)
}
