//! Pixel-space geometry: points, bounding rectangles and simple polygons.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A 2D position in pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Returns a copy shifted by `(dx, dy)`.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle, `min` inclusive to `max` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Canvas rectangle anchored at the origin.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(Point::new(0.0, 0.0), Point::new(width, height))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// A rectangle is usable when it is finite and has positive area.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.width() > 0.0 && self.height() > 0.0
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        self.contains_with_tolerance(p, 0.0)
    }

    pub fn contains_with_tolerance(&self, p: Point, eps: f64) -> bool {
        p.x >= self.min.x - eps
            && p.x <= self.max.x + eps
            && p.y >= self.min.y - eps
            && p.y <= self.max.y + eps
    }

    /// Corners in ring order starting at `min`.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }

    /// Smallest rectangle containing both `self` and `p`.
    pub fn include(&self, p: Point) -> Self {
        Self::new(
            Point::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            Point::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        )
    }

    /// Intersection with `other`, `None` when the overlap has no area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            Point::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            Point::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        );
        r.is_valid().then_some(r)
    }
}

/// A simple polygon as an implicitly closed vertex ring (first != last).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned square of half-size `half` around `center`.
    pub fn square(center: Point, half: f64) -> Self {
        Self::from(Rect::new(
            center.offset(-half, -half),
            center.offset(half, half),
        ))
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterates the ring's edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area, positive for counter-clockwise rings in a y-up frame.
    pub fn signed_area(&self) -> f64 {
        if self.vertices.len() < 3 {
            return 0.0;
        }
        self.edges().map(|(a, b)| a.x * b.y - b.x * a.y).sum::<f64>() / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Area centroid; falls back to the vertex mean for degenerate rings.
    pub fn centroid(&self) -> Option<Point> {
        if self.vertices.is_empty() {
            return None;
        }
        let a = self.signed_area();
        if a.abs() < crate::GEOMETRY_EPSILON {
            let n = self.vertices.len() as f64;
            let sum = self
                .vertices
                .iter()
                .fold(Point::default(), |acc, &p| acc + p);
            return Some(sum * (1.0 / n));
        }
        let (cx, cy) = self.edges().fold((0.0, 0.0), |(cx, cy), (p, q)| {
            let cross = p.x * q.y - q.x * p.y;
            (cx + (p.x + q.x) * cross, cy + (p.y + q.y) * cross)
        });
        Some(Point::new(cx / (6.0 * a), cy / (6.0 * a)))
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices[1..]
                .iter()
                .fold(Rect::new(first, first), |r, &p| r.include(p)),
        )
    }

    /// Check if a point is strictly inside the polygon using ray casting.
    ///
    /// Points exactly on an edge may go either way; use [`Polygon::touches`]
    /// when boundary membership matters.
    pub fn contains(&self, point: Point) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }

        let mut inside = false;
        let n = self.vertices.len();

        let mut j = n - 1;
        for i in 0..n {
            let pi = self.vertices[i];
            let pj = self.vertices[j];

            if ((pi.y > point.y) != (pj.y > point.y))
                && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Whether `point` lies within `eps` of the polygon's boundary.
    pub fn touches(&self, point: Point, eps: f64) -> bool {
        self.edges()
            .any(|(a, b)| segment_distance_squared(point, a, b) <= eps * eps)
    }

    pub fn contains_or_touches(&self, point: Point, eps: f64) -> bool {
        self.contains(point) || self.touches(point, eps)
    }

    /// Drops consecutive vertices closer than `eps`, including the wrap-around pair.
    pub fn dedup(&mut self, eps: f64) {
        let eps2 = eps * eps;
        self.vertices.dedup_by(|b, a| a.distance_squared(*b) <= eps2);
        while self.vertices.len() > 1 {
            let first = self.vertices[0];
            let last = self.vertices[self.vertices.len() - 1];
            if first.distance_squared(last) <= eps2 {
                self.vertices.pop();
            } else {
                break;
            }
        }
    }
}

impl From<Rect> for Polygon {
    fn from(rect: Rect) -> Self {
        Self::new(rect.corners().to_vec())
    }
}

fn segment_distance_squared(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.x * ab.x + ab.y * ab.y;
    if len2 == 0.0 {
        return p.distance_squared(a);
    }
    let t = (((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len2).clamp(0.0, 1.0);
    p.distance_squared(a + ab * t)
}
