use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use formpipe::{IngestError, IngestErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Ingest(#[from] IngestError),

    #[error("request body exceeds limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Ingest(err) => {
                StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::BAD_REQUEST)
            }
            ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Ingest(err) => ingest_error_code(err.kind()),
            ServerError::BodyTooLarge { .. } => "BODY_TOO_LARGE",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServerError::Ingest(IngestError::FieldTooLarge { field, max }) => {
                Some(json!({ "field": field, "limit": max }))
            }
            ServerError::Ingest(IngestError::FileTooLarge { field, max }) => {
                Some(json!({ "field": field, "limit": max }))
            }
            ServerError::Ingest(
                IngestError::TooManyFields { max } | IngestError::TooManyFiles { max },
            ) => Some(json!({ "limit": max })),
            ServerError::Ingest(IngestError::TotalSizeExceeded { max }) => {
                Some(json!({ "limit": max }))
            }
            ServerError::BodyTooLarge { limit } => Some(json!({ "limit": limit })),
            _ => None,
        }
    }
}

fn ingest_error_code(kind: IngestErrorKind) -> &'static str {
    match kind {
        IngestErrorKind::MissingOrInvalidContentType => "UNSUPPORTED_MEDIA_TYPE",
        IngestErrorKind::TooManyFields => "TOO_MANY_FIELDS",
        IngestErrorKind::FieldTooLarge => "FIELD_TOO_LARGE",
        IngestErrorKind::TooManyFiles => "TOO_MANY_FILES",
        IngestErrorKind::FileTooLarge => "FILE_TOO_LARGE",
        IngestErrorKind::TotalSizeExceeded => "TOTAL_SIZE_EXCEEDED",
        IngestErrorKind::MalformedMultipart => "MALFORMED_MULTIPART",
        IngestErrorKind::UnderlyingStreamError => "STREAM_ERROR",
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}
