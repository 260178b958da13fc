//! Frame and hit-test endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use semantic_tiles_ops::{HitRequest, OpsError, RecomputeRequest};
use tracing::{error, info};

use crate::types::{parent_id, ApiResponse, ApiState, ErrorResponse, FrameQuery, FrameResponse, HitQuery};

/// GET /frame - Recompute a level and return its render frame.
pub async fn frame_handler(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<FrameQuery>,
) -> Response {
    let request = RecomputeRequest {
        parent: parent_id(query.parent),
        width: query.width,
        height: query.height,
        ..RecomputeRequest::root()
    };

    match state.ctx.recompute(request).await {
        Ok(recompute) => {
            info!(
                parent = ?recompute.parent,
                tiles = recompute.tile_count(),
                applied = recompute.applied,
                "Frame computed"
            );
            let notices = state.drain_notices().await;
            let body = FrameResponse { recompute, notices };
            (StatusCode::OK, Json(ApiResponse::new(body))).into_response()
        }
        Err(e) => error_response("FRAME_ERROR", e),
    }
}

/// GET /hit - Resolve a canvas point against the last applied frame.
pub async fn hit_handler(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HitQuery>,
) -> Response {
    let request = HitRequest::new(parent_id(query.parent), query.x, query.y);

    match state.ctx.hit_test(request).await {
        Ok(response) => (StatusCode::OK, Json(ApiResponse::new(response))).into_response(),
        Err(e) => error_response("HIT_ERROR", e),
    }
}

fn error_response(code: &str, e: OpsError) -> Response {
    let (status, code) = match &e {
        OpsError::StoreNotFound { .. } => (StatusCode::NOT_FOUND, "STORE_NOT_FOUND"),
        OpsError::Layout(_) | OpsError::Tessellation(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, code),
    };
    error!(code, "Request failed: {}", e);
    (
        status,
        Json(ApiResponse::new(ErrorResponse {
            code: code.to_string(),
            message: e.to_string(),
        })),
    )
        .into_response()
}
