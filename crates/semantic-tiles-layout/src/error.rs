//! Error types for layout operations.

use thiserror::Error;

/// Errors that can occur while computing a layout.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// Canvas dimensions are not finite and positive.
    #[error("Invalid canvas {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },

    /// Configuration values are out of range.
    #[error("Invalid layout config: {0}")]
    InvalidConfig(String),
}
