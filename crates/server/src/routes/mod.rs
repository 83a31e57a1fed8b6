//! HTTP handlers.
//!
//! `health` serves the service routes, `upload` the multipart echo.

pub mod health;
pub mod upload;

use crate::error::ServerError;
use axum::Json;
use serde::Serialize;

/// Public routes listed by [`api_info`].
const ENDPOINTS: &[&str] = &["/api/v1/upload", "/api/v1/metadata", "/health", "/metrics"];

#[derive(Debug, Serialize)]
pub struct ApiInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub api_version: &'static str,
    pub endpoints: &'static [&'static str],
}

/// `GET /`
pub async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        name: "formpipe-server",
        version: env!("CARGO_PKG_VERSION"),
        api_version: "v1",
        endpoints: ENDPOINTS,
    })
}

/// Fallback for unknown routes
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
