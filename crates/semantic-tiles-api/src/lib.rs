//! REST API service for Semantic Tiles.
//!
//! A thin axum layer over [`TilesContext`]: every request goes through the
//! same recompute pipeline the CLI uses.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and version
//! - `GET /frame?parent=&width=&height=` - Recompute a level and return its render frame
//! - `GET /hit?parent=&x=&y=` - Resolve a canvas point against the last applied frame
//!
//! Every body is wrapped in [`ApiResponse`] (`{ data, timestamp }`). Frame
//! responses also carry the notices (such as failed position writes) that
//! arrived since the previous frame response.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use semantic_tiles_api::create_api_router;
//! use semantic_tiles_ops::{Config, JsonStore, TilesContext};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let store = Arc::new(JsonStore::new(&config.store_root));
//! let router = create_api_router(TilesContext::new(config, store));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

mod routes;
mod types;

pub use routes::create_api_router;
pub use types::{ApiResponse, ApiState, ErrorResponse, FrameQuery, FrameResponse, HealthResponse, HitQuery};

use std::sync::Arc;

use semantic_tiles_ops::TilesContext;
use tokio::sync::Mutex;

/// Create the shared API state, subscribing to notices from now on.
pub fn create_api_state(ctx: TilesContext) -> Arc<ApiState> {
    let notices = Mutex::new(ctx.subscribe());
    Arc::new(ApiState { ctx, notices })
}
