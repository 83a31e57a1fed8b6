use formpipe::IngestConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Environment prefix for overrides, e.g. `FORMPIPE_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "FORMPIPE_SERVER";

const MIB: usize = 1024 * 1024;

/// Server configuration
///
/// Every key is optional; missing keys fall back to [`ServerConfig::default`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,

    /// Whole-request deadline in seconds, ingestion included
    pub timeout_secs: u64,

    /// Hard cap on the raw request body in MiB, applied below ingestion.
    /// Should stay above `ingest.max_file_size` plus multipart overhead.
    pub max_body_size_mb: usize,

    pub enable_cors: bool,

    /// `tracing_subscriber::EnvFilter` directive
    pub log_level: String,

    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics_enabled: bool,

    /// Multipart ingestion limits and coercion switches
    pub ingest: IngestConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: 8080,
            timeout_secs: 30,
            // Default ingest limits at their worst: 10 files of 10 MiB plus
            // 100 fields of 64 KiB, with room left for framing.
            max_body_size_mb: 110,
            enable_cors: true,
            log_level: "info".into(),
            metrics_enabled: true,
            ingest: IngestConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional `server.{toml,yaml,json}` file overlaid by the
    /// environment. Nested keys use `__`, e.g.
    /// `FORMPIPE_SERVER__INGEST__MAX_FILES=4`.
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: ServerConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Fails on ingest limits that contradict each other; a body cap below
    /// the per-file cap is allowed but logged.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.ingest.validate()?;

        let body_limit = self.max_body_size() as u64;
        if body_limit < self.ingest.max_file_size {
            tracing::warn!(
                body_limit,
                max_file_size = self.ingest.max_file_size,
                "body limit below max_file_size, large uploads will be cut at the transport"
            );
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind_addr, self.port).parse()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Body cap in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb.saturating_mul(MIB)
    }
}
