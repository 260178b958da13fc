//! Response DTOs for operations.

use semantic_tiles_core::DomainId;
use semantic_tiles_layout::LayoutStrategy;
use semantic_tiles_tessellation::{Pick, RenderFrame};
use serde::{Deserialize, Serialize};

/// Response from a recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeResponse {
    pub parent: Option<DomainId>,

    /// Generation this request was issued as.
    pub generation: u64,

    /// False when a newer request for the same level superseded this one.
    pub applied: bool,

    pub strategy: LayoutStrategy,

    /// Relaxation steps run.
    pub iterations: u32,

    pub converged: bool,

    /// Distance entries that did not resolve to a usable link.
    pub dropped_links: usize,

    /// Whether a position write was queued.
    pub persist_queued: bool,

    pub frame: RenderFrame,
}

impl RecomputeResponse {
    /// Get tile count.
    pub fn tile_count(&self) -> usize {
        self.frame.len()
    }
}

/// Response from a hit-test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitResponse {
    pub parent: Option<DomainId>,
    pub x: f64,
    pub y: f64,

    /// Region under the point, ignoring decorations.
    pub domain: Option<DomainId>,

    /// Click target, decorations first.
    pub pick: Option<Pick>,
}
