//! slidecache server entry point.
//!
//! Boots the edge tier and the in-page resource manager, then serves MCP on
//! stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use slidecache_client::{FetchClient, FetchConfig, ResourceManager, ResourceManagerConfig};
use slidecache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod deck;
mod edge;
mod error;
mod handler;
mod tools;

const CONTROL_BUFFER: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        db_path = %config.db_path.display(),
        origin = %config.origin,
        version = %config.cache_version,
        "Starting slidecache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let edge = edge::EdgeCacheService::new(db.clone(), network, &config)?;
    if let Err(err) = edge.startup().await {
        tracing::warn!(error = %err, "edge startup incomplete, previous generation keeps serving");
    }
    let (control, _control_task) = edge::control::spawn(edge.clone(), CONTROL_BUFFER);

    let deck = Arc::new(deck::ConfiguredDeck::new(config.slides.clone()));
    let manager = Arc::new(ResourceManager::new(
        ResourceManagerConfig::from_app(&config)?,
        db,
        Arc::new(edge.clone()),
        deck.clone(),
    ));
    manager.start().await;
    let background = manager.spawn_background();

    let handler = handler::SlideCacheServer::new(edge, control, Arc::clone(&manager), deck);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    for task in background {
        task.abort();
    }
    if let Err(err) = manager.persist().await {
        tracing::warn!(error = %err, "final image cache persist failed");
    }

    Ok(())
}
