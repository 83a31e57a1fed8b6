use crate::error::ServerResult;
use crate::extract::Form;
use crate::middleware::RequestId;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use formpipe::ParsedPayload;
use serde::Serialize;

/// Response of the upload endpoint
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub request_id: String,
    /// Distinct field names
    pub keys: usize,
    pub files: usize,
    pub total_file_bytes: u64,
    /// Normalized payload; files appear as metadata objects without content
    pub payload: ParsedPayload,
}

/// Echo the normalized multipart payload
///
/// `POST /api/v1/upload`
pub async fn upload(
    request_id: Option<Extension<RequestId>>,
    Form(payload): Form,
) -> ServerResult<impl IntoResponse> {
    let files = payload.files();
    let total_file_bytes: u64 = files.iter().map(|file| file.size()).sum();
    let file_count = files.len();

    tracing::debug!(
        keys = payload.len(),
        files = file_count,
        total_file_bytes,
        "upload_received"
    );

    Ok(Json(UploadResponse {
        request_id: request_id.map(|Extension(id)| id.0).unwrap_or_default(),
        keys: payload.len(),
        files: file_count,
        total_file_bytes,
        payload,
    }))
}
