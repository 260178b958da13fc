//! Core domain types shared across the Semantic Tiles workspace.
//!
//! A *domain* is a node in a knowledge hierarchy. Sibling domains are laid
//! out on a canvas (see `semantic-tiles-layout`) and the canvas is then
//! partitioned into one region per domain (see `semantic-tiles-tessellation`).
//! This crate only holds the data that flows between those stages.

mod distance;
mod domain;
mod geometry;

pub use distance::{pair_key, parse_pair_key, resolve_pair_key, DistanceMap};
pub use domain::{DocumentRef, Domain, DomainId, LayoutSnapshot, PositionedDomain};
pub use geometry::{Point, Polygon, Rect};

/// Tolerance used when comparing pixel-space coordinates.
pub const GEOMETRY_EPSILON: f64 = 1e-9;
