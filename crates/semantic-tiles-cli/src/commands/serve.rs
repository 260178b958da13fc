//! Serve command implementation.
//!
//! Serves the REST API (via semantic-tiles-api) over the JSON store.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use semantic_tiles_api::create_api_router;
use semantic_tiles_ops::Config;
use tokio::net::TcpListener;
use tracing::info;

use super::open_context;

/// Run the API server until interrupted.
pub async fn execute(config: Config, host: &str, port: u16) -> Result<()> {
    let store_root = config.store_root.clone();
    let ctx = open_context(config);
    let app = Router::new().nest("/api", create_api_router(ctx.clone()));

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    // Print server info
    println!();
    println!("Semantic Tiles API");
    println!("   Store: {}", store_root.display());
    println!("   URL:   http://{}/api/health", addr);
    println!("   Frame: http://{}/api/frame?width=800&height=600", addr);
    println!();
    println!("   Press Ctrl+C to stop");
    println!();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    ctx.flush().await;
    Ok(())
}
