//! Render payload and click targets.

use semantic_tiles_core::{DomainId, Point, Polygon, PositionedDomain, Rect};
use serde::{Deserialize, Serialize};

use crate::voronoi::{DegeneracyStats, TessellationConfig};

/// Everything a front end needs to draw one level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    pub bounds: Rect,
    pub tiles: Vec<TileView>,
    pub stats: DegeneracyStats,
}

impl RenderFrame {
    /// Frame with no tiles.
    pub fn empty(bounds: Rect) -> Self {
        Self {
            bounds,
            tiles: Vec::new(),
            stats: DegeneracyStats::default(),
        }
    }

    pub fn tile(&self, id: &str) -> Option<&TileView> {
        self.tiles.iter().find(|t| t.id.as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// One drawn region with its decorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileView {
    pub id: DomainId,
    pub name: String,
    pub polygon: Polygon,
    /// Label anchor, at the domain's position.
    pub label: Point,
    pub delete_anchor: Point,
    pub documents: Vec<DocumentMarker>,
    #[serde(default)]
    pub degenerate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMarker {
    pub id: String,
    pub name: String,
    pub position: Point,
}

/// What a click landed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pick {
    /// The delete affordance of a domain.
    Delete { id: DomainId },
    /// A document marker inside a domain.
    Document { domain: DomainId, document: String },
    /// The region body.
    Domain { id: DomainId },
}

impl Pick {
    /// Domain the pick belongs to.
    pub fn domain(&self) -> &DomainId {
        match self {
            Pick::Delete { id } | Pick::Domain { id } => id,
            Pick::Document { domain, .. } => domain,
        }
    }
}

pub fn delete_anchor(site: Point, config: &TessellationConfig) -> Point {
    site + config.delete_offset
}

/// Document markers in a row centred under the site.
pub fn document_markers(domain: &PositionedDomain, config: &TessellationConfig) -> Vec<DocumentMarker> {
    let k = domain.documents.len();
    let half = (k as f64 - 1.0) / 2.0;
    domain
        .documents
        .iter()
        .enumerate()
        .map(|(i, doc)| DocumentMarker {
            id: doc.id.clone(),
            name: doc.name.clone(),
            position: Point::new(
                domain.x + (i as f64 - half) * config.document_spacing,
                domain.y + config.document_offset,
            ),
        })
        .collect()
}
