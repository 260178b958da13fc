//! Region index: the queryable, incrementally updatable form of a tessellation.

use std::collections::HashSet;

use semantic_tiles_core::{DomainId, Point, Polygon, PositionedDomain, Rect};
use tracing::{debug, warn};

use crate::delaunay::Triangulation;
use crate::error::TessellationError;
use crate::frame::{delete_anchor, document_markers, Pick, RenderFrame, TileView};
use crate::voronoi::{
    clip_region, separate_site, DegeneracyStats, Region, Tessellation, TessellationConfig,
};
use crate::Result;

#[derive(Debug, Clone)]
struct Site {
    domain: PositionedDomain,
    /// Position used for clipping; differs from the domain's after jitter.
    point: Point,
    jittered: bool,
    region: Polygon,
    bbox: Option<Rect>,
    degenerate: bool,
}

impl Site {
    fn new(domain: PositionedDomain, point: Point, jittered: bool) -> Self {
        Self {
            domain,
            point,
            jittered,
            region: Polygon::default(),
            bbox: None,
            degenerate: false,
        }
    }
}

/// Regions of one sibling set, in site order, with hit-testing.
///
/// Site order is the tie-break for every query: a point on a shared
/// boundary belongs to the lowest-index region that touches it.
#[derive(Debug, Clone)]
pub struct RegionIndex {
    bounds: Rect,
    config: TessellationConfig,
    sites: Vec<Site>,
    triangulation: Triangulation,
}

impl RegionIndex {
    /// Build regions for all `points` inside `bounds`.
    pub fn build(
        points: &[PositionedDomain],
        bounds: Rect,
        config: &TessellationConfig,
    ) -> Result<Self> {
        check_bounds(bounds)?;

        let mut seen = HashSet::with_capacity(points.len());
        let mut placed = Vec::with_capacity(points.len());
        let mut sites = Vec::with_capacity(points.len());
        for domain in points {
            if !seen.insert(&domain.id) {
                return Err(TessellationError::DuplicateSite(domain.id.clone()));
            }
            let (point, jittered) = place(domain, &placed, config)?;
            placed.push(point);
            sites.push(Site::new(domain.clone(), point, jittered));
        }

        let mut index = Self {
            bounds,
            config: config.clone(),
            triangulation: Triangulation::from_sites(&placed, bounds),
            sites,
        };
        let all: Vec<usize> = (0..index.sites.len()).collect();
        index.reclip(&all);

        let stats = index.stats();
        debug!(
            sites = index.sites.len(),
            jittered = stats.jittered,
            degenerate = stats.degenerate_regions,
            "Region index built"
        );
        Ok(index)
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn config(&self) -> &TessellationConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn stats(&self) -> DegeneracyStats {
        DegeneracyStats {
            jittered: self.sites.iter().filter(|s| s.jittered).count(),
            degenerate_regions: self.sites.iter().filter(|s| s.degenerate).count(),
        }
    }

    /// Region polygons in site order.
    pub fn regions(&self) -> impl Iterator<Item = (&DomainId, &Polygon)> {
        self.sites.iter().map(|s| (&s.domain.id, &s.region))
    }

    pub fn domains(&self) -> impl Iterator<Item = &PositionedDomain> {
        self.sites.iter().map(|s| &s.domain)
    }

    /// Region of a single domain.
    pub fn get(&self, id: &str) -> Option<&Polygon> {
        self.position(id).map(|i| &self.sites[i].region)
    }

    /// Snapshot as a plain [`Tessellation`].
    pub fn tessellation(&self) -> Tessellation {
        let regions = self
            .sites
            .iter()
            .map(|s| {
                let region = Region {
                    id: s.domain.id.clone(),
                    site: s.point,
                    polygon: s.region.clone(),
                };
                (s.domain.id.clone(), region)
            })
            .collect();
        Tessellation {
            regions,
            stats: self.stats(),
        }
    }

    /// Domain whose region contains or touches `(x, y)`.
    ///
    /// Returns `None` outside the bounds.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&DomainId> {
        let p = Point::new(x, y);
        let tol = self.config.hit_tolerance;
        if !p.is_finite() || !self.bounds.contains_with_tolerance(p, tol) {
            return None;
        }

        self.sites
            .iter()
            .find(|s| {
                s.bbox.is_some_and(|b| b.contains_with_tolerance(p, tol))
                    && s.region.contains_or_touches(p, tol)
            })
            // Rounding gaps between rings fall back to the nearest site.
            .or_else(|| {
                self.sites
                    .iter()
                    .min_by(|a, b| a.point.distance_squared(p).total_cmp(&b.point.distance_squared(p)))
            })
            .map(|s| &s.domain.id)
    }

    /// Resolve a click: delete affordances first, then document markers,
    /// then the region under the point.
    pub fn pick(&self, x: f64, y: f64) -> Option<Pick> {
        let p = Point::new(x, y);
        if !p.is_finite() {
            return None;
        }

        for site in &self.sites {
            let anchor = delete_anchor(site.domain.point(), &self.config);
            if anchor.distance(p) <= self.config.delete_radius {
                return Some(Pick::Delete {
                    id: site.domain.id.clone(),
                });
            }
        }

        for site in &self.sites {
            for marker in document_markers(&site.domain, &self.config) {
                if marker.position.distance(p) <= self.config.document_radius {
                    return Some(Pick::Document {
                        domain: site.domain.id.clone(),
                        document: marker.id,
                    });
                }
            }
        }

        self.hit_test(x, y)
            .map(|id| Pick::Domain { id: id.clone() })
    }

    /// Serializable render payload.
    pub fn frame(&self) -> RenderFrame {
        let tiles = self
            .sites
            .iter()
            .map(|s| TileView {
                id: s.domain.id.clone(),
                name: s.domain.name.clone(),
                polygon: s.region.clone(),
                label: s.domain.point(),
                delete_anchor: delete_anchor(s.domain.point(), &self.config),
                documents: document_markers(&s.domain, &self.config),
                degenerate: s.degenerate,
            })
            .collect();
        RenderFrame {
            bounds: self.bounds,
            tiles,
            stats: self.stats(),
        }
    }

    /// Add a site, re-clipping only its region and its Delaunay neighbours.
    ///
    /// Returns the number of regions that were recomputed.
    pub fn insert(&mut self, domain: PositionedDomain) -> Result<usize> {
        if self.position(domain.id.as_str()).is_some() {
            return Err(TessellationError::DuplicateSite(domain.id));
        }
        let placed = self.points();
        let (point, jittered) = place(&domain, &placed, &self.config)?;

        let index = match self.triangulation.insert(point) {
            Some(i) => i,
            None => {
                // Outside the current super-triangle: start over with a larger frame.
                let mut all = placed;
                all.push(point);
                self.triangulation = Triangulation::from_sites(&all, self.bounds);
                all.len() - 1
            }
        };
        self.sites.push(Site::new(domain, point, jittered));

        let mut targets = self.triangulation.neighbors(index);
        targets.push(index);
        self.reclip(&targets);

        debug!(
            id = %self.sites[index].domain.id,
            reclipped = targets.len(),
            "Inserted site"
        );
        Ok(targets.len())
    }

    /// Remove a site, re-clipping only its former neighbours.
    ///
    /// Returns the removed domain, or `None` for an unknown id.
    pub fn remove(&mut self, id: &str) -> Option<PositionedDomain> {
        let index = self.position(id)?;
        let former = self.triangulation.neighbors(index);
        let site = self.sites.remove(index);
        self.triangulation = Triangulation::from_sites(&self.points(), self.bounds);

        let targets: Vec<usize> = former
            .into_iter()
            .map(|j| if j > index { j - 1 } else { j })
            .collect();
        self.reclip(&targets);

        debug!(id, reclipped = targets.len(), "Removed site");
        Some(site.domain)
    }

    /// Move a site to `(x, y)`. The site moves to the end of the order.
    ///
    /// Returns `Ok(false)` for an unknown id.
    pub fn move_site(&mut self, id: &str, x: f64, y: f64) -> Result<bool> {
        let Some(mut domain) = self.remove(id) else {
            return Ok(false);
        };
        domain.x = x;
        domain.y = y;
        self.insert(domain)?;
        Ok(true)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sites.iter().position(|s| s.domain.id.as_str() == id)
    }

    fn points(&self) -> Vec<Point> {
        self.sites.iter().map(|s| s.point).collect()
    }

    fn reclip(&mut self, targets: &[usize]) {
        let points = self.points();
        for &i in targets {
            let neighbors = self.triangulation.neighbors(i);
            let clipped = clip_region(i, &points, &neighbors, self.bounds, &self.config);
            let site = &mut self.sites[i];
            if clipped.certified > 0 {
                debug!(id = %site.domain.id, extra = clipped.certified, "Region certified with extra clips");
            }
            if clipped.degenerate {
                warn!(id = %site.domain.id, "Region collapsed, using minimal square");
            }
            site.bbox = clipped.polygon.bounding_box();
            site.region = clipped.polygon;
            site.degenerate = clipped.degenerate;
        }
    }
}

fn check_bounds(bounds: Rect) -> Result<()> {
    if bounds.is_valid() {
        Ok(())
    } else {
        Err(TessellationError::InvalidBounds {
            width: bounds.width(),
            height: bounds.height(),
        })
    }
}

/// Validate a site's position and separate it from `placed`.
fn place(
    domain: &PositionedDomain,
    placed: &[Point],
    config: &TessellationConfig,
) -> Result<(Point, bool)> {
    let p = domain.point();
    if !p.is_finite() {
        return Err(TessellationError::NonFiniteSite(domain.id.clone()));
    }
    Ok(match separate_site(p, placed, config) {
        Some(q) => {
            debug!(id = %domain.id, x = q.x, y = q.y, "Jittered duplicate site");
            (q, true)
        }
        None => (p, false),
    })
}
