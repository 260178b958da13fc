//! Bounded Voronoi regions from the Delaunay dual.
//!
//! Each region starts as the bounds rectangle and is clipped by the
//! perpendicular bisector of every Delaunay neighbour. A certification pass
//! then checks the clipped ring's vertices against all sites and clips again
//! by any site that is strictly closer, so the result is the exact nearest-site
//! cell even when floating-point noise hides a neighbour.

use indexmap::IndexMap;
use semantic_tiles_core::{DomainId, Point, Polygon, PositionedDomain, Rect, GEOMETRY_EPSILON};
use serde::{Deserialize, Serialize};

use crate::index::RegionIndex;
use crate::Result;

/// Golden angle in radians, used to spread repeated jitter offsets.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Tessellation and decoration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationConfig {
    /// Sites closer than this are treated as duplicates.
    pub duplicate_epsilon: f64,
    /// Base offset (pixels) applied to duplicate sites.
    pub jitter: f64,
    /// Half-size of the square used for regions that clip away to nothing.
    pub min_region_half_size: f64,
    /// Ring vertices closer than this are merged.
    pub vertex_epsilon: f64,
    /// Distance within which a point counts as touching a region boundary.
    pub hit_tolerance: f64,
    /// Delete affordance position relative to the site.
    pub delete_offset: Point,
    /// Vertical offset of the document marker row below the site.
    pub document_offset: f64,
    /// Horizontal spacing between document markers.
    pub document_spacing: f64,
    /// Pick radius of the delete affordance.
    pub delete_radius: f64,
    /// Pick radius of a document marker.
    pub document_radius: f64,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self {
            duplicate_epsilon: 1e-6,
            jitter: 0.01,
            min_region_half_size: 0.5,
            vertex_epsilon: 1e-7,
            hit_tolerance: 1e-6,
            delete_offset: Point::new(30.0, -30.0),
            document_offset: 40.0,
            document_spacing: 20.0,
            delete_radius: 10.0,
            document_radius: 8.0,
        }
    }
}

/// Counters for geometry that needed special handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegeneracyStats {
    /// Sites that were nudged off a duplicate.
    pub jittered: usize,
    /// Regions replaced by a minimal square.
    pub degenerate_regions: usize,
}

/// One domain's region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: DomainId,
    /// Site used for clipping, after any jitter.
    pub site: Point,
    pub polygon: Polygon,
}

/// All regions of a sibling set, keyed by id in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tessellation {
    pub regions: IndexMap<DomainId, Region>,
    pub stats: DegeneracyStats,
}

impl Tessellation {
    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.get(id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Sum of region areas.
    pub fn total_area(&self) -> f64 {
        self.regions.values().map(|r| r.polygon.area()).sum()
    }
}

/// Partition `bounds` into one region per positioned domain.
///
/// Fails only on unusable bounds, duplicate ids or non-finite positions;
/// coincident and collinear sites are handled internally.
pub fn build_tessellation(
    points: &[PositionedDomain],
    bounds: Rect,
    config: &TessellationConfig,
) -> Result<Tessellation> {
    Ok(RegionIndex::build(points, bounds, config)?.tessellation())
}

/// Nudge `site` off any already placed site closer than `duplicate_epsilon`.
///
/// Returns `None` when the site is already distinct.
pub(crate) fn separate_site(
    site: Point,
    placed: &[Point],
    config: &TessellationConfig,
) -> Option<Point> {
    let eps2 = config.duplicate_epsilon * config.duplicate_epsilon;
    let collides = |q: Point| placed.iter().any(|s| s.distance_squared(q) <= eps2);
    if !collides(site) {
        return None;
    }

    let step = config
        .jitter
        .max(2.0 * config.duplicate_epsilon)
        .max(GEOMETRY_EPSILON);
    let mut k = 1u32;
    loop {
        let angle = f64::from(k) * GOLDEN_ANGLE;
        let r = f64::from(k) * step;
        let candidate = site.offset(r * angle.cos(), r * angle.sin());
        if !collides(candidate) {
            return Some(candidate);
        }
        k += 1;
    }
}

/// A clipped region plus how it was obtained.
pub(crate) struct ClippedRegion {
    pub polygon: Polygon,
    pub degenerate: bool,
    /// Extra half-planes applied by certification.
    pub certified: usize,
}

/// Compute the bounded cell of `sites[index]`.
pub(crate) fn clip_region(
    index: usize,
    sites: &[Point],
    neighbors: &[usize],
    bounds: Rect,
    config: &TessellationConfig,
) -> ClippedRegion {
    let site = sites[index];
    let mut applied = vec![false; sites.len()];
    applied[index] = true;

    let mut ring = bounds.corners().to_vec();
    for &j in neighbors {
        applied[j] = true;
        ring = clip_half_plane(&ring, site, sites[j]);
        if ring.is_empty() {
            break;
        }
    }

    let mut certified = 0;
    while let Some(j) = closer_site(&ring, site, sites, &applied) {
        applied[j] = true;
        certified += 1;
        ring = clip_half_plane(&ring, site, sites[j]);
    }

    let mut polygon = Polygon::new(ring);
    polygon.dedup(config.vertex_epsilon);
    if polygon.len() >= 3 && polygon.area() > GEOMETRY_EPSILON {
        return ClippedRegion {
            polygon,
            degenerate: false,
            certified,
        };
    }

    let h = config.min_region_half_size;
    let square = Rect::new(site.offset(-h, -h), site.offset(h, h));
    let polygon = match square.intersection(&bounds) {
        Some(r) => Polygon::from(r),
        None => Polygon::square(site, h),
    };
    ClippedRegion {
        polygon,
        degenerate: true,
        certified,
    }
}

/// First unapplied site strictly closer than `site` to some ring vertex.
fn closer_site(ring: &[Point], site: Point, sites: &[Point], applied: &[bool]) -> Option<usize> {
    ring.iter().find_map(|&v| {
        let own = v.distance_squared(site);
        let tol = GEOMETRY_EPSILON * own.max(1.0);
        sites
            .iter()
            .enumerate()
            .find(|&(j, s)| !applied[j] && s.distance_squared(v) < own - tol)
            .map(|(j, _)| j)
    })
}

/// Sutherland-Hodgman step keeping the side of the bisector nearer `site`.
fn clip_half_plane(ring: &[Point], site: Point, other: Point) -> Vec<Point> {
    let n = other - site;
    let mid = (site + other) * 0.5;
    let c = n.x * mid.x + n.y * mid.y;
    let side = |p: Point| n.x * p.x + n.y * p.y - c;

    let len = ring.len();
    let mut out = Vec::with_capacity(len + 1);
    for i in 0..len {
        let cur = ring[i];
        let prev = ring[(i + len - 1) % len];
        let (dc, dp) = (side(cur), side(prev));
        if dc <= 0.0 {
            if dp > 0.0 {
                out.push(crossing(prev, cur, dp, dc));
            }
            out.push(cur);
        } else if dp <= 0.0 {
            out.push(crossing(prev, cur, dp, dc));
        }
    }
    out
}

fn crossing(a: Point, b: Point, da: f64, db: f64) -> Point {
    let t = da / (da - db);
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Rect {
        Rect::from_size(800.0, 600.0)
    }

    fn sites(points: &[(f64, f64)]) -> Vec<PositionedDomain> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| PositionedDomain::at(i as u64, x, y))
            .collect()
    }

    fn assert_covers_bounds(t: &Tessellation) {
        let area = t.total_area();
        assert!(
            (area - bounds().area()).abs() < 1e-6 * bounds().area(),
            "area sum {area}"
        );
    }

    #[test]
    fn test_two_sites_split_at_bisector() {
        let t = build_tessellation(
            &sites(&[(200.0, 300.0), (600.0, 300.0)]),
            bounds(),
            &TessellationConfig::default(),
        )
        .unwrap();
        assert_eq!(t.len(), 2);
        let left = &t.get("0").unwrap().polygon;
        let bb = left.bounding_box().unwrap();
        assert!((bb.max.x - 400.0).abs() < 1e-9);
        assert!((left.area() - 400.0 * 600.0).abs() < 1e-6);
        assert_covers_bounds(&t);
    }

    #[test]
    fn test_single_site_gets_whole_bounds() {
        let t = build_tessellation(
            &sites(&[(10.0, 10.0)]),
            bounds(),
            &TessellationConfig::default(),
        )
        .unwrap();
        assert!((t.get("0").unwrap().polygon.area() - bounds().area()).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_gives_empty_tessellation() {
        let t = build_tessellation(&[], bounds(), &TessellationConfig::default()).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.stats, DegeneracyStats::default());
    }

    #[test]
    fn test_collinear_sites_make_strips() {
        let input = sites(&[
            (100.0, 300.0),
            (250.0, 300.0),
            (400.0, 300.0),
            (550.0, 300.0),
            (700.0, 300.0),
        ]);
        let t = build_tessellation(&input, bounds(), &TessellationConfig::default()).unwrap();
        assert_eq!(t.len(), 5);
        assert_eq!(t.stats.degenerate_regions, 0);
        for region in t.regions.values() {
            let bb = region.polygon.bounding_box().unwrap();
            assert!((bb.min.y - 0.0).abs() < 1e-9 && (bb.max.y - 600.0).abs() < 1e-9);
        }
        assert_covers_bounds(&t);
    }

    #[test]
    fn test_grid_areas_sum_to_bounds() {
        let mut pts = Vec::new();
        for i in 0..5 {
            for j in 0..4 {
                pts.push((80.0 + 160.0 * i as f64, 75.0 + 150.0 * j as f64));
            }
        }
        let t = build_tessellation(&sites(&pts), bounds(), &TessellationConfig::default()).unwrap();
        assert_eq!(t.len(), 20);
        for region in t.regions.values() {
            assert!((region.polygon.area() - 160.0 * 150.0).abs() < 1e-6);
        }
        assert_covers_bounds(&t);
    }

    #[test]
    fn test_duplicates_are_jittered_and_counted() {
        let input = sites(&[(300.0, 300.0), (300.0, 300.0), (300.0, 300.0), (500.0, 200.0)]);
        let t = build_tessellation(&input, bounds(), &TessellationConfig::default()).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.stats.jittered, 2);
        let s1 = t.get("1").unwrap().site;
        let s2 = t.get("2").unwrap().site;
        assert!(s1 != s2);
        assert!(s1.distance(Point::new(300.0, 300.0)) < 0.1);
        assert_covers_bounds(&t);
    }

    #[test]
    fn test_site_outside_bounds_still_gets_region() {
        let input = sites(&[(400.0, 300.0), (5000.0, 5000.0)]);
        let t = build_tessellation(&input, bounds(), &TessellationConfig::default()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.stats.degenerate_regions, 1);
        assert!(t.get("1").unwrap().polygon.len() >= 3);
        assert!((t.get("0").unwrap().polygon.area() - bounds().area()).abs() < 1e-6);
    }

    #[test]
    fn test_site_on_boundary() {
        let input = sites(&[(0.0, 0.0), (800.0, 600.0), (400.0, 300.0)]);
        let t = build_tessellation(&input, bounds(), &TessellationConfig::default()).unwrap();
        assert_eq!(t.stats.degenerate_regions, 0);
        assert_covers_bounds(&t);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let err = build_tessellation(
            &sites(&[(1.0, 1.0)]),
            Rect::from_size(0.0, 600.0),
            &TessellationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, crate::TessellationError::InvalidBounds { .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let input = vec![
            PositionedDomain::at("a", 100.0, 100.0),
            PositionedDomain::at("a", 300.0, 100.0),
        ];
        let err = build_tessellation(&input, bounds(), &TessellationConfig::default()).unwrap_err();
        assert_eq!(err, crate::TessellationError::DuplicateSite("a".into()));
    }

    #[test]
    fn test_clip_half_plane_keeps_near_side() {
        let ring = Rect::from_size(10.0, 10.0).corners().to_vec();
        let out = clip_half_plane(&ring, Point::new(2.0, 5.0), Point::new(8.0, 5.0));
        let poly = Polygon::new(out);
        assert!((poly.area() - 50.0).abs() < 1e-12);
        assert!(poly.vertices().iter().all(|p| p.x <= 5.0 + 1e-12));
    }

    #[test]
    fn test_separate_site_uses_golden_angle_steps() {
        let config = TessellationConfig::default();
        let placed = [Point::new(10.0, 10.0)];
        assert_eq!(separate_site(Point::new(50.0, 50.0), &placed, &config), None);
        let moved = separate_site(Point::new(10.0, 10.0), &placed, &config).unwrap();
        assert!((moved.distance(placed[0]) - config.jitter).abs() < 1e-12);
    }
}
