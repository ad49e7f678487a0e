//! appcache-mcp server entry point.
//!
//! Boots the offline cache engine and serves it as an MCP server on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use appcache_client::engine::{AppCacheEngine, EngineConfig, SessionTable};
use appcache_client::fetch::{FetchClient, FetchConfig};
use appcache_core::{AppConfig, CacheDb};

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db_path = %config.db_path.display(), origin = %config.origin, "Starting appcache-mcp server on stdio transport");

    let db = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let sessions = Arc::new(SessionTable::new());
    let engine = AppCacheEngine::from_db(EngineConfig::try_from(&config)?, db, network, sessions.clone());

    let handler = handler::AppCacheServer::new(Arc::new(engine), sessions);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
