//! Placement of sibling domains on a canvas.
//!
//! This crate turns a sibling set of [`Domain`](semantic_tiles_core::Domain)s
//! plus an optional sparse [`DistanceMap`](semantic_tiles_core::DistanceMap)
//! into one position per domain, so that semantically close domains end up
//! spatially close.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────────────────┐
//! │ DistanceMap  │───▶│ build_links  │───▶│      compute_layout      │
//! │ ("a,b": 0.3) │    │ (filter,     │    │ empty │ reuse │ single   │
//! └──────────────┘    │  scale)      │    │ force-directed │ circular│
//!                     └──────────────┘    └────────────┬─────────────┘
//!                                                      │
//!                          ┌───────────────────────────┤
//!                          ▼                           ▼
//!                ┌──────────────────┐       ┌────────────────────┐
//!                │ ForceSimulation  │◀─────▶│ QuadTree           │
//!                │ links, repulsion,│       │ (Barnes-Hut, large │
//!                │ collide, center  │       │  sibling sets)     │
//!                └──────────────────┘       └────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Unpositioned domains are seeded from a [`rand::rngs::StdRng`] seeded with
//! [`LayoutConfig::seed`], and relaxation stops on a displacement threshold
//! or a hard iteration cap, so identical inputs give identical layouts.

mod distance;
mod error;
mod layout;
mod quadtree;
mod simulation;

pub use distance::{build_links, Link, LinkScale, LinkSet};
pub use error::LayoutError;
pub use layout::{
    circular_positions, clamp_to_margin, compute_layout, LayoutConfig, LayoutOutcome,
    LayoutStrategy,
};
pub use quadtree::{QuadTree, QuadTreeNode};
pub use simulation::{ForceSimulation, SimulationState};

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
