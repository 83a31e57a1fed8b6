use crate::error::ServerError;
use crate::state::ServerState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use formpipe::IngestError;
use futures::TryStreamExt;
use http_body_util::LengthLimitError;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Identifier attached to every request, echoed in `x-request-id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Multipart ingestion middleware
///
/// Requests whose content type is not `multipart/*` pass through untouched.
/// Multipart bodies are ingested in full before the handler runs; the parsed
/// payload is attached to the request extensions and the body is replaced by
/// an empty one. Ingestion failures short-circuit into an error response.
pub async fn multipart_ingest(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if !content_type.as_deref().is_some_and(is_multipart) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let start = Instant::now();

    let body_limit_hit = Arc::new(AtomicBool::new(false));
    let stream = body.into_data_stream().map_err({
        let body_limit_hit = body_limit_hit.clone();
        move |err| {
            if exceeds_body_limit(&err) {
                body_limit_hit.store(true, Ordering::Relaxed);
            }
            err
        }
    });
    let result =
        formpipe::ingest_stream(stream, content_type.as_deref(), state.ingest_config()).await;
    metrics::histogram!("formpipe_ingest_duration_seconds").record(start.elapsed().as_secs_f64());

    match result {
        Ok(payload) => {
            metrics::counter!("formpipe_ingest_requests_total", "outcome" => "success")
                .increment(1);
            parts.extensions.insert(payload);
            Ok(next.run(Request::from_parts(parts, Body::empty())).await)
        }
        Err(IngestError::UnderlyingStreamError(_)) if body_limit_hit.load(Ordering::Relaxed) => {
            metrics::counter!("formpipe_ingest_requests_total", "outcome" => "body_too_large")
                .increment(1);
            Err(ServerError::BodyTooLarge {
                limit: state.config.max_body_size(),
            })
        }
        Err(err) => {
            metrics::counter!("formpipe_ingest_requests_total", "outcome" => err.kind().as_str())
                .increment(1);
            Err(ServerError::Ingest(err))
        }
    }
}

/// Whether the body limit layer cut the stream; its error sits somewhere in
/// the source chain of the transport error.
fn exceeds_body_limit(err: &axum::Error) -> bool {
    let mut current = Some(err as &(dyn StdError + 'static));
    while let Some(err) = current {
        if err.is::<LengthLimitError>() {
            return true;
        }
        current = err.source();
    }
    false
}

/// Any `multipart/*` media type; the ingest layer decides whether it is usable.
fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
}

/// Request ID injection middleware
pub async fn request_id(mut request: Request, next: Next) -> Response {
    // Generate or extract request ID
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // Add to request extensions for handlers to access
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    tracing::info!(
        method = %method,
        uri = %uri,
        request_id = %request_id,
        "Request started"
    );

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        request_id = %request_id,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use http_body_util::{BodyExt, Full, Limited};

    #[tokio::test]
    async fn body_limit_errors_are_recognized_through_wrapping() {
        let body = Limited::new(Full::new(Bytes::from_static(b"0123456789")), 4);
        let over_limit = body.collect().await.err().expect("ten bytes exceed four");
        assert!(exceeds_body_limit(&axum::Error::new(over_limit)));

        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(!exceeds_body_limit(&axum::Error::new(reset)));
    }

    #[test]
    fn multipart_detection() {
        assert!(is_multipart("multipart/form-data; boundary=x"));
        assert!(is_multipart("Multipart/Form-Data"));
        assert!(is_multipart("multipart/mixed; boundary=x"));
        assert!(!is_multipart("application/json"));
        assert!(!is_multipart("multi"));
        assert!(!is_multipart(""));
    }
}
