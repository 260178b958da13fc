//! Error types for the operations layer.

use std::path::PathBuf;

use semantic_tiles_layout::LayoutError;
use semantic_tiles_tessellation::TessellationError;
use thiserror::Error;

/// Result type for operations.
pub type OpsResult<T> = Result<T, OpsError>;

/// Errors that can occur during operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The `.tiles` store doesn't exist.
    #[error("No .tiles catalog found at {path}. Create one or point TILES_STORE_ROOT elsewhere.")]
    StoreNotFound { path: PathBuf },

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Layout rejected its input.
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Tessellation rejected its input.
    #[error("Tessellation error: {0}")]
    Tessellation(#[from] TessellationError),

    /// Writing positions back to the store failed.
    #[error("Failed to persist positions: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context.
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl OpsError {
    /// Create a new error with additional context.
    pub fn with_context(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: message.into(),
        }
    }
}
