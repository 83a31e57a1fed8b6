//! Extractor for payloads produced by [`multipart_ingest`](crate::middleware::multipart_ingest).

use crate::error::ServerError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use formpipe::ParsedPayload;

/// The normalized multipart payload of the current request.
///
/// Takes the payload out of the request extensions; rejects with 400 when the
/// request carried no multipart body.
#[derive(Debug, Clone)]
pub struct Form(pub ParsedPayload);

impl<S> FromRequestParts<S> for Form
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .remove::<ParsedPayload>()
            .map(Form)
            .ok_or_else(|| ServerError::BadRequest("expected a multipart/form-data body".into()))
    }
}

/// Like [`Form`], but yields `None` instead of rejecting.
#[derive(Debug, Clone)]
pub struct MaybeForm(pub Option<ParsedPayload>);

impl<S> FromRequestParts<S> for MaybeForm
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeForm(parts.extensions.remove::<ParsedPayload>()))
    }
}
