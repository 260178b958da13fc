//! Incremental Bowyer-Watson Delaunay triangulation.
//!
//! Vertices `0..3` form a super-triangle that encloses the working frame;
//! every real site is inserted inside it. Triangles touching the
//! super-triangle are kept, since their real-real edges are still Delaunay
//! edges (this is what keeps collinear inputs connected).

use std::collections::{BTreeSet, HashMap};

use semantic_tiles_core::{Point, Rect};

const SUPER_VERTICES: usize = 3;

/// A Delaunay triangulation over a growing set of sites.
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// Super-triangle vertices followed by sites in insertion order.
    vertices: Vec<Point>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Empty triangulation able to accept sites inside (and well around) `frame`.
    pub fn new(frame: Rect) -> Self {
        let d = frame.width().max(frame.height()).max(1.0) * 10.0;
        let c = frame.center();
        Self {
            vertices: vec![
                Point::new(c.x - 20.0 * d, c.y - d),
                Point::new(c.x, c.y + 20.0 * d),
                Point::new(c.x + 20.0 * d, c.y - d),
            ],
            triangles: vec![[0, 1, 2]],
        }
    }

    /// Triangulate `sites`, sizing the super-triangle to cover `bounds` and all sites.
    pub fn from_sites(sites: &[Point], bounds: Rect) -> Self {
        let frame = sites.iter().fold(bounds, |r, &p| r.include(p));
        let mut tri = Self::new(frame);
        for &p in sites {
            // frame covers every site, so insertion cannot be refused
            let _ = tri.insert(p);
        }
        tri
    }

    /// Number of real sites.
    pub fn site_count(&self) -> usize {
        self.vertices.len() - SUPER_VERTICES
    }

    pub fn site(&self, index: usize) -> Point {
        self.vertices[index + SUPER_VERTICES]
    }

    /// Whether `p` lies strictly inside the super-triangle.
    pub fn covers(&self, p: Point) -> bool {
        let [a, b, c] = [self.vertices[0], self.vertices[1], self.vertices[2]];
        let o1 = orient(a, b, p);
        let o2 = orient(b, c, p);
        let o3 = orient(c, a, p);
        (o1 > 0.0 && o2 > 0.0 && o3 > 0.0) || (o1 < 0.0 && o2 < 0.0 && o3 < 0.0)
    }

    /// Insert a site, returning its index, or `None` if it lies outside the
    /// super-triangle (callers then rebuild with a larger frame).
    pub fn insert(&mut self, p: Point) -> Option<usize> {
        if !p.is_finite() || !self.covers(p) {
            return None;
        }

        let vertex = self.vertices.len();
        self.vertices.push(p);

        let mut edge_count: HashMap<(usize, usize), usize> = HashMap::new();
        let mut kept = Vec::with_capacity(self.triangles.len() + 2);

        for tri in self.triangles.drain(..) {
            let [a, b, c] = tri.map(|v| self.vertices[v]);
            if in_circumcircle(a, b, c, p) {
                for (u, v) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                    *edge_count.entry((u.min(v), u.max(v))).or_insert(0) += 1;
                }
            } else {
                kept.push(tri);
            }
        }

        // Boundary edges of the cavity appear exactly once.
        let mut boundary: Vec<(usize, usize)> = edge_count
            .into_iter()
            .filter_map(|(edge, count)| (count == 1).then_some(edge))
            .collect();
        boundary.sort_unstable();

        kept.extend(boundary.into_iter().map(|(u, v)| [u, v, vertex]));
        self.triangles = kept;

        Some(vertex - SUPER_VERTICES)
    }

    /// Delaunay neighbours of a site, as sorted site indices.
    pub fn neighbors(&self, site: usize) -> Vec<usize> {
        let vertex = site + SUPER_VERTICES;
        let mut out = BTreeSet::new();
        for tri in &self.triangles {
            if tri.contains(&vertex) {
                for &v in tri {
                    if v != vertex && v >= SUPER_VERTICES {
                        out.insert(v - SUPER_VERTICES);
                    }
                }
            }
        }
        out.into_iter().collect()
    }

    /// Triangles made only of real sites, as site indices.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangles
            .iter()
            .filter(|t| t.iter().all(|&v| v >= SUPER_VERTICES))
            .map(|t| t.map(|v| v - SUPER_VERTICES))
    }
}

/// Twice the signed area of `abc`; positive for counter-clockwise turns.
fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether `p` is strictly inside the circumcircle of `abc`, either winding.
fn in_circumcircle(a: Point, b: Point, c: Point, p: Point) -> bool {
    let (ax, ay) = (a.x - p.x, a.y - p.y);
    let (bx, by) = (b.x - p.x, b.y - p.y);
    let (cx, cy) = (c.x - p.x, c.y - p.y);
    let det = (ax * ax + ay * ay) * (bx * cy - cx * by) - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    det * orient(a, b, c) > 0.0
}
