//! Router assembly and process lifecycle.
//!
//! Layer order, outermost first: trace, request id, request log, CORS,
//! compression, timeout, body limit. Multipart ingestion is a route layer
//! on the upload routes only, so it runs after the body limit is in place.

use crate::config::ServerConfig;
use crate::middleware::{log_requests, multipart_ingest, request_id};
use crate::routes::{api_info, health, not_found, upload};
use crate::state::ServerState;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the application router around `state`.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let config = &state.config;

    let cors = if config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let uploads = Router::new()
        .route("/api/v1/upload", post(upload::upload))
        .route_layer(from_fn_with_state(state.clone(), multipart_ingest));

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/api/v1/metadata", get(health::server_metadata))
        .merge(uploads)
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(config.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server until SIGTERM or Ctrl+C.
///
/// ```rust,no_run
/// # async fn run() -> anyhow::Result<()> {
/// let config = server::ServerConfig::load()?;
/// server::start_server(config).await
/// # }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config.log_level)?;

    let mut state = ServerState::new(config.clone())?;
    if config.metrics_enabled {
        state = state.with_metrics(PrometheusBuilder::new().install_recorder()?);
    }

    let addr = config.socket_addr()?;
    let limits = &config.ingest;
    tracing::info!(
        %addr,
        timeout_secs = config.timeout_secs,
        max_body_size_mb = config.max_body_size_mb,
        cors = config.enable_cors,
        metrics = config.metrics_enabled,
        "formpipe_server_starting"
    );
    tracing::info!(
        max_file_size = limits.max_file_size,
        max_files = limits.max_files,
        max_fields = limits.max_fields,
        max_field_size = limits.max_field_size,
        max_total_file_size = ?limits.max_total_file_size,
        "ingest_limits"
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("formpipe_server_stopped");
    Ok(())
}

fn init_tracing(filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .json()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}

/// Resolves on the first of Ctrl+C or SIGTERM. A handler that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "ctrl_c", "shutdown_requested"),
        _ = terminate => tracing::info!(signal = "sigterm", "shutdown_requested"),
    }
}
