//! Error types for tessellation operations.

use semantic_tiles_core::DomainId;
use thiserror::Error;

/// Errors that can occur while building or updating a tessellation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TessellationError {
    /// The bounding rectangle is empty or not finite.
    #[error("Invalid bounds {width}x{height}")]
    InvalidBounds { width: f64, height: f64 },

    /// Two sites share an id.
    #[error("Duplicate site id: {0}")]
    DuplicateSite(DomainId),

    /// A site has a NaN or infinite coordinate.
    #[error("Site {0} has a non-finite position")]
    NonFiniteSite(DomainId),
}
