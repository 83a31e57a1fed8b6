//! axum host for Formpipe multipart ingestion.
//!
//! [`multipart_ingest`] parses `multipart/*` request bodies under the limits in
//! [`ServerConfig::ingest`] before the handler runs and hands the result to
//! handlers through the [`Form`] extractor. Ingestion failures are answered
//! by [`ServerError`] with a JSON body: 415 for content type problems, 413
//! for limits, 400 for malformed or interrupted bodies.
//!
//! ```rust,no_run
//! # async fn run() -> anyhow::Result<()> {
//! let config = server::ServerConfig::load()?;
//! server::start_server(config).await
//! # }
//! ```
//!
//! Routes: `GET /`, `GET /health`, `GET /metrics`, `GET /api/v1/metadata`
//! and `POST /api/v1/upload`, which echoes the normalized payload.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use extract::{Form, MaybeForm};
pub use middleware::{multipart_ingest, RequestId};
pub use server::{build_router, start_server};
pub use state::ServerState;
