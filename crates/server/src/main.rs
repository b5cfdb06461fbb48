//! swcache server entry point.
//!
//! Loads configuration, opens the cache store, installs and activates the
//! caching worker, then serves its fetch hook and control channel as MCP
//! tools on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb, CacheWorker, SystemClock};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        origin = %config.origin,
        preset = ?config.preset,
        generation = %config.generation_name(),
        "Starting swcache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await.context("opening cache store")?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let worker = CacheWorker::new(
        Arc::new(db),
        Arc::new(fetcher),
        config.classifier()?,
        config.worker_settings()?,
        Arc::new(SystemClock),
    );

    match worker.install().await {
        Ok(()) => {
            let removed = worker.activate().await?;
            tracing::info!(removed = ?removed, "worker activated");
        }
        Err(e) => {
            tracing::error!(error = %e, "install failed; serving every request as passthrough");
        }
    }

    let handler = handler::SwCacheServer::new(Arc::new(worker));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
