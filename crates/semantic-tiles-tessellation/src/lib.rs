//! Partition of a canvas into one region per positioned domain.
//!
//! Regions are the Voronoi cells of the domain positions, clipped to the
//! canvas rectangle. The [`RegionIndex`] keeps them queryable: hit-testing,
//! click picking with decoration priority, incremental insert/remove, and a
//! serializable [`RenderFrame`] for front ends.
//!
//! ```
//! use semantic_tiles_core::{PositionedDomain, Rect};
//! use semantic_tiles_tessellation::{RegionIndex, TessellationConfig};
//!
//! let sites = vec![
//!     PositionedDomain::at("left", 200.0, 300.0),
//!     PositionedDomain::at("right", 600.0, 300.0),
//! ];
//! let index = RegionIndex::build(&sites, Rect::from_size(800.0, 600.0), &TessellationConfig::default())?;
//! assert_eq!(index.hit_test(100.0, 100.0).map(|id| id.as_str()), Some("left"));
//! # Ok::<(), semantic_tiles_tessellation::TessellationError>(())
//! ```

mod delaunay;
mod error;
mod frame;
mod index;
mod voronoi;

pub use delaunay::Triangulation;
pub use error::TessellationError;
pub use frame::{delete_anchor, document_markers, DocumentMarker, Pick, RenderFrame, TileView};
pub use index::RegionIndex;
pub use voronoi::{build_tessellation, DegeneracyStats, Region, Tessellation, TessellationConfig};

/// Result type for tessellation operations.
pub type Result<T> = std::result::Result<T, TessellationError>;
