//! Barnes-Hut quadtree for O(n log n) force approximation.
//!
//! The quadtree recursively subdivides space and computes center of mass
//! for each cell. Distant cells can be approximated as single points,
//! reducing the O(n²) pairwise force calculation to O(n log n).

use semantic_tiles_core::Point;

/// A cell of the flattened quadtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadTreeNode {
    /// Center of mass.
    pub center: Point,
    /// Total mass (number of sites in this cell).
    pub mass: f64,
    /// Cell width (for Barnes-Hut theta criterion).
    pub width: f64,
    /// Children in NW, NE, SW, SE order.
    pub children: [Option<usize>; 4],
}

impl QuadTreeNode {
    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

/// A Barnes-Hut quadtree for 2D spatial partitioning.
#[derive(Debug)]
pub struct QuadTree {
    /// Flattened tree nodes, root first.
    nodes: Vec<QuadTreeNode>,
    /// Bounding box min
    bounds_min: Point,
    /// Bounding box max
    bounds_max: Point,
}

impl QuadTree {
    /// Build a quadtree from site positions.
    ///
    /// # Arguments
    /// * `positions` - Slice of site positions
    /// * `max_depth` - Maximum tree depth (typically 10-15)
    pub fn build(positions: &[Point], max_depth: usize) -> Self {
        if positions.is_empty() {
            return Self {
                nodes: Vec::new(),
                bounds_min: Point::default(),
                bounds_max: Point::default(),
            };
        }

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;

        for pos in positions {
            min_x = min_x.min(pos.x);
            min_y = min_y.min(pos.y);
            max_x = max_x.max(pos.x);
            max_y = max_y.max(pos.y);
        }

        // Add padding
        let padding = ((max_x - min_x).max(max_y - min_y) * 0.1).max(1.0);
        min_x -= padding;
        min_y -= padding;
        max_x += padding;
        max_y += padding;

        // Make it square
        let width = (max_x - min_x).max(max_y - min_y);
        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;

        let bounds_min = Point::new(center_x - width / 2.0, center_y - width / 2.0);
        let bounds_max = Point::new(center_x + width / 2.0, center_y + width / 2.0);

        let mut nodes = Vec::with_capacity(positions.len() * 2);
        let mut builder = TreeBuilder {
            positions,
            nodes: &mut nodes,
            max_depth,
        };

        let indices: Vec<usize> = (0..positions.len()).collect();
        builder.build_node(&indices, bounds_min.x, bounds_min.y, width, 0);

        Self {
            nodes,
            bounds_min,
            bounds_max,
        }
    }

    /// Get the flattened tree nodes.
    pub fn nodes(&self) -> &[QuadTreeNode] {
        &self.nodes
    }

    /// Get the bounding box.
    pub fn bounds(&self) -> (Point, Point) {
        (self.bounds_min, self.bounds_max)
    }

    /// Many-body velocity delta at `p` (before alpha scaling).
    ///
    /// Cells whose `width / distance` is below `theta` are treated as a single
    /// body at their center of mass. Coincident bodies contribute nothing.
    pub fn force_at(&self, p: Point, strength: f64, theta: f64, distance_min: f64) -> Point {
        let mut acc = Point::default();
        if self.nodes.is_empty() {
            return acc;
        }
        let theta2 = theta * theta;
        let min2 = distance_min * distance_min;
        let mut stack = vec![0usize];

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            let d = node.center - p;
            let mut l2 = d.x * d.x + d.y * d.y;
            let far = node.width * node.width / theta2 < l2;

            if far || node.is_leaf() {
                if l2 == 0.0 {
                    continue;
                }
                if l2 < min2 {
                    l2 = (min2 * l2).sqrt();
                }
                acc = acc + d * (strength * node.mass / l2);
            } else {
                stack.extend(node.children.iter().flatten());
            }
        }

        acc
    }
}

struct TreeBuilder<'a> {
    positions: &'a [Point],
    nodes: &'a mut Vec<QuadTreeNode>,
    max_depth: usize,
}

impl<'a> TreeBuilder<'a> {
    fn build_node(
        &mut self,
        indices: &[usize],
        x: f64,
        y: f64,
        width: f64,
        depth: usize,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let node_idx = self.nodes.len();
        self.nodes.push(QuadTreeNode::default());

        let mass = indices.len() as f64;
        let sum = indices
            .iter()
            .fold(Point::default(), |acc, &i| acc + self.positions[i]);
        let center = sum * (1.0 / mass);

        // If leaf (single site or max depth), store as leaf
        if indices.len() == 1 || depth >= self.max_depth {
            self.nodes[node_idx] = QuadTreeNode {
                center,
                mass,
                width,
                children: [None; 4],
            };
            return Some(node_idx);
        }

        // Subdivide into quadrants
        let half_width = width / 2.0;
        let mid_x = x + half_width;
        let mid_y = y + half_width;

        let mut nw_indices = Vec::new();
        let mut ne_indices = Vec::new();
        let mut sw_indices = Vec::new();
        let mut se_indices = Vec::new();

        for &i in indices {
            let pos = &self.positions[i];
            if pos.x < mid_x {
                if pos.y < mid_y {
                    sw_indices.push(i);
                } else {
                    nw_indices.push(i);
                }
            } else if pos.y < mid_y {
                se_indices.push(i);
            } else {
                ne_indices.push(i);
            }
        }

        let children = [
            self.build_node(&nw_indices, x, mid_y, half_width, depth + 1),
            self.build_node(&ne_indices, mid_x, mid_y, half_width, depth + 1),
            self.build_node(&sw_indices, x, y, half_width, depth + 1),
            self.build_node(&se_indices, mid_x, y, half_width, depth + 1),
        ];

        self.nodes[node_idx] = QuadTreeNode {
            center,
            mass,
            width,
            children,
        };

        Some(node_idx)
    }
}
