//! API types and DTOs.

use std::time::{SystemTime, UNIX_EPOCH};

use semantic_tiles_core::DomainId;
use semantic_tiles_ops::{Notice, RecomputeResponse, TilesContext};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, Mutex};
use tracing::warn;

/// Shared application state for the API.
pub struct ApiState {
    /// The operations context.
    pub ctx: TilesContext,
    /// Notices not yet delivered to a client.
    pub notices: Mutex<broadcast::Receiver<Notice>>,
}

impl ApiState {
    /// Take every notice received so far.
    pub async fn drain_notices(&self) -> Vec<Notice> {
        let mut rx = self.notices.lock().await;
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(notice) => out.push(notice),
                Err(TryRecvError::Lagged(n)) => {
                    warn!(skipped = n, "Notice receiver lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        out
    }
}

/// Response wrapper with timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response data.
    pub data: T,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
}

impl<T> ApiResponse<T> {
    /// Create a new API response with current timestamp.
    pub fn new(data: T) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { data, timestamp }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

/// Query parameters for `GET /frame`.
#[derive(Debug, Default, Deserialize)]
pub struct FrameQuery {
    /// Parent domain id; absent or empty for the top level.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

/// Query parameters for `GET /hit`.
#[derive(Debug, Deserialize)]
pub struct HitQuery {
    #[serde(default)]
    pub parent: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// Recompute result plus pending notices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResponse {
    #[serde(flatten)]
    pub recompute: RecomputeResponse,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

/// Empty or missing parent means the top level.
pub(crate) fn parent_id(parent: Option<String>) -> Option<DomainId> {
    parent
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(DomainId::from)
}
