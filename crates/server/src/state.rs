use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use formpipe::IngestConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Renders the Prometheus exposition when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state, rejecting unusable ingestion limits
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config
            .ingest
            .validate()
            .map_err(|err| ServerError::Config(err.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            metrics: None,
        })
    }

    /// Attach the handle of an installed Prometheus recorder
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Limits applied to every multipart request
    pub fn ingest_config(&self) -> &IngestConfig {
        &self.config.ingest
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
    pub limits: IngestConfig,
}
