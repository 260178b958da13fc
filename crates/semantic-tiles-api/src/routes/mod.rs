//! API route handlers.

mod frame;
mod health;

use std::sync::Arc;

use axum::{routing::get, Router};
use semantic_tiles_ops::TilesContext;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::create_api_state;
use crate::types::ApiState;

/// Create the API router with all endpoints.
pub fn create_api_router(ctx: TilesContext) -> Router {
    router(create_api_state(ctx))
}

fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health::health_handler))
        // Frames
        .route("/frame", get(frame::frame_handler))
        .route("/hit", get(frame::hit_handler))
        // Request tracing (enable with RUST_LOG=tower_http=info or higher)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
