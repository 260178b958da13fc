//! Request DTOs for operations.
//!
//! Each request type carries everything an operation needs, so the CLI, the
//! REST API and tests all call the same entry points.

use semantic_tiles_core::DomainId;
use serde::{Deserialize, Serialize};

/// Request to lay out and tessellate one level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeRequest {
    /// Parent whose children are laid out (`None` for the top level).
    #[serde(default)]
    pub parent: Option<DomainId>,

    /// Canvas width; falls back to the configured default.
    #[serde(default)]
    pub width: Option<f64>,

    /// Canvas height; falls back to the configured default.
    #[serde(default)]
    pub height: Option<f64>,

    /// Whether moved positions are written back to the store.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_persist() -> bool {
    true
}

impl RecomputeRequest {
    /// Top level of the hierarchy.
    pub fn root() -> Self {
        Self {
            parent: None,
            width: None,
            height: None,
            persist: true,
        }
    }

    /// Children of `parent`.
    pub fn for_parent(parent: impl Into<DomainId>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::root()
        }
    }

    /// Use an explicit canvas size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Skip writing positions back.
    pub fn without_persist(mut self) -> Self {
        self.persist = false;
        self
    }
}

/// Request to resolve a canvas point on a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRequest {
    #[serde(default)]
    pub parent: Option<DomainId>,
    pub x: f64,
    pub y: f64,
}

impl HitRequest {
    pub fn new(parent: Option<DomainId>, x: f64, y: f64) -> Self {
        Self { parent, x, y }
    }
}
