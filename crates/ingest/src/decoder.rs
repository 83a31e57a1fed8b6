//! Boundary between the ingestion controller and the multipart wire decoder.
//!
//! The controller never sees bytes of multipart framing. It consumes a strictly
//! ordered sequence of [`DecoderEvent`]s from a [`PartSource`]; each file part
//! carries its own [`FileBody`] sub-stream that must be read (or drained) to its
//! end before the next event can be produced.
//!
//! [`MulterSource`] is the production source, backed by the `multer` streaming
//! decoder. Tests drive the controller with scripted sources instead.
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::IngestError;
use crate::limits::LimitKind;
use crate::types::FileInfo;

/// RFC 2046 caps multipart boundaries at 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

const DEFAULT_TRANSFER_ENCODING: &str = "7bit";

/// RFC 7578: a part without a Content-Type is `text/plain`.
const DEFAULT_PART_MIME: &str = "text/plain";

/// A failure reported by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Bad framing, bad part headers, truncated body.
    Malformed(String),
    /// The transport stream feeding the decoder failed.
    Transport(String),
    /// A decoder-side limit tripped.
    Limit(LimitKind),
}

impl From<multer::Error> for DecodeError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamReadFailed(source) => DecodeError::Transport(source.to_string()),
            other => DecodeError::Malformed(other.to_string()),
        }
    }
}

/// One decoded event. [`Error`](DecoderEvent::Error) and
/// [`Finish`](DecoderEvent::Finish) are terminal: nothing follows them.
#[derive(Debug)]
pub enum DecoderEvent<B> {
    /// A complete text field.
    Field {
        name: String,
        /// Decoded value; invalid UTF-8 is replaced, so it may be longer
        /// than what was sent.
        value: String,
        /// Bytes of the value as sent, before UTF-8 decoding.
        raw_len: usize,
        /// The decoder stopped retaining bytes at the field size limit.
        truncated: bool,
    },
    /// The start of a file part; its content is read from `body`.
    File { name: String, body: B, info: FileInfo },
    /// The decoder hit one of its own limits.
    Limit(LimitKind),
    /// The decoder cannot continue.
    Error(DecodeError),
    /// The closing boundary was read.
    Finish,
}

/// Readable content of one file part.
#[async_trait]
pub trait FileBody: Send {
    /// Next chunk of the part, or `None` once the part has ended.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, DecodeError>;
}

/// Ordered producer of decoder events.
#[async_trait]
pub trait PartSource: Send {
    type Body: FileBody;

    /// Produces the next event. Must not be called again after a terminal event.
    async fn next_event(&mut self) -> DecoderEvent<Self::Body>;
}

/// Extracts the boundary from a `multipart/form-data` content type.
///
/// ```rust
/// use ingest::parse_boundary;
///
/// let boundary = parse_boundary(Some("multipart/form-data; boundary=\"abc\"")).unwrap();
/// assert_eq!(boundary, "abc");
/// assert!(parse_boundary(Some("application/json")).is_err());
/// assert!(parse_boundary(None).is_err());
/// ```
pub fn parse_boundary(content_type: Option<&str>) -> Result<String, IngestError> {
    let Some(content_type) = content_type else {
        return Err(IngestError::MissingOrInvalidContentType(
            "content type header is absent".into(),
        ));
    };

    let mut params = content_type.trim().split(';');
    let media_type = params.next().unwrap_or("").trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return Err(IngestError::MissingOrInvalidContentType(format!(
            "expected multipart/form-data, got '{media_type}'"
        )));
    }

    for param in params {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("boundary") {
            continue;
        }
        let boundary = value.trim().trim_matches('"');
        if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
            return Err(IngestError::MissingOrInvalidContentType(format!(
                "boundary must be 1..={MAX_BOUNDARY_LEN} characters"
            )));
        }
        return Ok(boundary.to_owned());
    }

    Err(IngestError::MissingOrInvalidContentType(
        "multipart content type declares no boundary".into(),
    ))
}

/// [`PartSource`] over a `multer` decoder.
pub struct MulterSource {
    multipart: multer::Multipart<'static>,
    max_field_size: usize,
}

impl MulterSource {
    /// Wraps a body stream already known to carry `boundary`.
    ///
    /// Text values are retained up to `max_field_size` bytes; the remainder is
    /// read and discarded and the event is flagged as truncated.
    pub fn new<S, O, E>(body: S, boundary: impl Into<String>, max_field_size: usize) -> Self
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        Self {
            multipart: multer::Multipart::new(body, boundary),
            max_field_size,
        }
    }
}

/// Reads a text part, retaining at most `max_field_size` bytes.
async fn read_text(
    name: String,
    mut field: multer::Field<'static>,
    max_field_size: usize,
) -> DecoderEvent<MulterFileBody> {
    let mut value = Vec::new();
    let mut truncated = false;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                if truncated {
                    continue;
                }
                let room = max_field_size.saturating_sub(value.len());
                if chunk.len() > room {
                    value.extend_from_slice(&chunk[..room]);
                    truncated = true;
                } else {
                    value.extend_from_slice(&chunk);
                }
            }
            Ok(None) => break,
            Err(err) => return DecoderEvent::Error(err.into()),
        }
    }
    DecoderEvent::Field {
        name,
        raw_len: value.len(),
        value: String::from_utf8_lossy(&value).into_owned(),
        truncated,
    }
}

#[async_trait]
impl PartSource for MulterSource {
    type Body = MulterFileBody;

    async fn next_event(&mut self) -> DecoderEvent<MulterFileBody> {
        let field = match self.multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return DecoderEvent::Finish,
            Err(err) => return DecoderEvent::Error(err.into()),
        };

        let name = field.name().unwrap_or_default().to_owned();
        let Some(filename) = field.file_name().map(str::to_owned) else {
            return read_text(name, field, self.max_field_size).await;
        };

        let encoding = field
            .headers()
            .get("content-transfer-encoding")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_TRANSFER_ENCODING.to_owned());
        let mime_type = field
            .content_type()
            .map(ToString::to_string)
            .unwrap_or_else(|| DEFAULT_PART_MIME.to_owned());

        DecoderEvent::File {
            name,
            body: MulterFileBody { field },
            info: FileInfo {
                filename,
                encoding,
                mime_type,
            },
        }
    }
}

/// Content of one file part decoded by `multer`.
pub struct MulterFileBody {
    field: multer::Field<'static>,
}

impl fmt::Debug for MulterFileBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulterFileBody")
            .field("name", &self.field.name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FileBody for MulterFileBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, DecodeError> {
        self.field.chunk().await.map_err(DecodeError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use futures::stream;

    use super::*;

    fn body_stream(body: &'static str) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
        stream::iter(
            body.as_bytes()
                .chunks(7)
                .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn boundary_parsing() {
        assert_eq!(
            parse_boundary(Some(
                "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW"
            ))
            .unwrap(),
            "----WebKitFormBoundary7MA4YWxkTrZu0gW"
        );
        assert_eq!(
            parse_boundary(Some("Multipart/Form-Data; charset=utf-8; Boundary=\"x y\"")).unwrap(),
            "x y"
        );
    }

    #[test]
    fn boundary_rejections() {
        let too_long = format!("multipart/form-data; boundary={}", "a".repeat(71));
        for content_type in [
            None,
            Some("application/json"),
            Some("multipart/form-data"),
            Some("multipart/form-data; boundary="),
            Some("multipart/mixed; boundary=abc"),
            Some(too_long.as_str()),
        ] {
            assert!(
                matches!(
                    parse_boundary(content_type),
                    Err(IngestError::MissingOrInvalidContentType(_))
                ),
                "{content_type:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn multer_source_emits_ordered_events() {
        let body = concat!(
            "--xyz\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n",
            "\r\n",
            "Hello\r\n",
            "--xyz\r\n",
            "Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n",
            "Content-Type: text/markdown\r\n",
            "\r\n",
            "# heading\r\n",
            "--xyz--\r\n"
        );
        let mut source = MulterSource::new(body_stream(body), "xyz", 1024);

        match source.next_event().await {
            DecoderEvent::Field {
                name,
                value,
                raw_len,
                truncated,
            } => {
                assert_eq!(name, "title");
                assert_eq!(value, "Hello");
                assert_eq!(raw_len, 5);
                assert!(!truncated);
            }
            other => panic!("expected field, got {other:?}"),
        }

        match source.next_event().await {
            DecoderEvent::File {
                name,
                mut body,
                info,
            } => {
                assert_eq!(name, "doc");
                assert_eq!(info.filename, "a.txt");
                assert_eq!(info.mime_type, "text/markdown");
                assert_eq!(info.encoding, "7bit");
                let mut content = Vec::new();
                while let Some(chunk) = body.next_chunk().await.expect("chunk") {
                    content.extend_from_slice(&chunk);
                }
                assert_eq!(content, b"# heading");
            }
            other => panic!("expected file, got {other:?}"),
        }

        assert!(matches!(source.next_event().await, DecoderEvent::Finish));
    }

    #[tokio::test]
    async fn multer_source_truncates_long_fields() {
        let body = concat!(
            "--xyz\r\n",
            "Content-Disposition: form-data; name=\"bio\"\r\n",
            "\r\n",
            "abcdefghijklmnopqrstuvwxyz\r\n",
            "--xyz--\r\n"
        );
        let mut source = MulterSource::new(body_stream(body), "xyz", 10);
        match source.next_event().await {
            DecoderEvent::Field {
                value,
                raw_len,
                truncated,
                ..
            } => {
                assert_eq!(value, "abcdefghij");
                assert_eq!(raw_len, 10);
                assert!(truncated);
            }
            other => panic!("expected field, got {other:?}"),
        }
        assert!(matches!(source.next_event().await, DecoderEvent::Finish));
    }

    #[tokio::test]
    async fn invalid_utf8_keeps_its_wire_length() {
        let mut body = b"--xyz\r\nContent-Disposition: form-data; name=\"raw\"\r\n\r\n".to_vec();
        body.extend_from_slice(&[0xff, 0xfe, 0xfd, 0xfc]);
        body.extend_from_slice(b"\r\n--xyz--\r\n");
        let stream = futures::stream::once(async move { Ok::<_, Infallible>(Bytes::from(body)) });
        let mut source = MulterSource::new(stream, "xyz", 4);

        match source.next_event().await {
            DecoderEvent::Field {
                value,
                raw_len,
                truncated,
                ..
            } => {
                assert_eq!(raw_len, 4);
                assert!(!truncated);
                assert_eq!(value, "\u{fffd}".repeat(4));
                assert_eq!(value.len(), 12);
            }
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multer_source_reports_truncated_body() {
        let body = concat!(
            "--xyz\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n",
            "\r\n",
            "never closed"
        );
        let mut source = MulterSource::new(body_stream(body), "xyz", 1024);
        assert!(matches!(
            source.next_event().await,
            DecoderEvent::Error(DecodeError::Malformed(_))
        ));
    }
}
