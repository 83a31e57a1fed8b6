//! Formpipe Server - HTTP host for multipart ingestion
//!
//! Reads `.env` when present, then loads configuration from `server.*` and
//! `FORMPIPE_SERVER__*` environment variables.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Load configuration
    let config = ServerConfig::load()?;

    // Start server
    server::start_server(config).await?;

    Ok(())
}
