//! Layout engine: picks a placement strategy and produces positioned domains.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use semantic_tiles_core::{DistanceMap, Domain, LayoutSnapshot, Point, PositionedDomain, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::distance::{build_links, LinkScale};
use crate::simulation::{ForceSimulation, SimulationState};
use crate::{LayoutError, Result};

/// Configuration for the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Seed for placing domains that have no position yet.
    pub seed: u64,
    /// Minimum distance between a site and the canvas edge.
    pub margin: f64,
    /// Hard cap on relaxation steps.
    pub max_iterations: u32,
    /// Steps to run before the convergence test applies.
    pub min_iterations: u32,
    /// Mean per-site displacement (px) below which the run stops.
    pub convergence_threshold: f64,
    /// Alpha reached after `max_iterations` steps of cooling.
    pub alpha_min: f64,
    /// Fraction of velocity lost per step (0-1).
    pub velocity_decay: f64,
    /// Many-body repulsion strength.
    pub repulsion: f64,
    /// Distance below which repulsion stops growing.
    pub distance_min: f64,
    /// Fraction of the centroid offset corrected per step (0-1).
    pub center_strength: f64,
    /// Collision radius; sites are kept `2 * collide_radius` apart.
    pub collide_radius: f64,
    /// Collision correction strength (0-1).
    pub collide_strength: f64,
    /// Scale from semantic distance to spring length.
    pub link_scale: LinkScale,
    /// Use Barnes-Hut for repulsion on large sibling sets.
    pub use_barnes_hut: bool,
    /// Site count above which Barnes-Hut replaces the exact sum.
    pub barnes_hut_threshold: usize,
    /// Barnes-Hut theta (0.5-1.0).
    pub theta: f64,
    /// Maximum quadtree depth.
    pub max_tree_depth: usize,
    /// Circular fallback radius is `min(width, height) / circle_divisor`.
    pub circle_divisor: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_711E5,
            margin: 50.0,
            max_iterations: 300,
            min_iterations: 30,
            convergence_threshold: 0.01,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            repulsion: 30.0,
            distance_min: 1.0,
            center_strength: 1.0,
            collide_radius: 40.0,
            collide_strength: 0.5,
            link_scale: LinkScale::default(),
            use_barnes_hut: true,
            barnes_hut_threshold: 64,
            theta: 0.9,
            max_tree_depth: 12,
            circle_divisor: 2.5,
        }
    }
}

impl LayoutConfig {
    /// Reject values that would make the simulation diverge or panic.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(LayoutError::InvalidConfig(format!("{name} must be in [0, 1], got {v}")))
            }
        };
        unit("velocity_decay", self.velocity_decay)?;
        unit("center_strength", self.center_strength)?;
        unit("collide_strength", self.collide_strength)?;

        if !(self.alpha_min > 0.0 && self.alpha_min < 1.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "alpha_min must be in (0, 1), got {}",
                self.alpha_min
            )));
        }
        if !(self.margin >= 0.0 && self.margin.is_finite()) {
            return Err(LayoutError::InvalidConfig(format!(
                "margin must be non-negative, got {}",
                self.margin
            )));
        }
        if !(self.circle_divisor > 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "circle_divisor must be positive, got {}",
                self.circle_divisor
            )));
        }
        let non_negative = |name: &str, v: f64| {
            if v >= 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(LayoutError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {v}"
                )))
            }
        };
        non_negative("convergence_threshold", self.convergence_threshold)?;
        non_negative("collide_radius", self.collide_radius)?;
        if !self.repulsion.is_finite() {
            return Err(LayoutError::InvalidConfig(format!(
                "repulsion must be finite, got {}",
                self.repulsion
            )));
        }
        if !(self.distance_min > 0.0 && self.distance_min.is_finite()) {
            return Err(LayoutError::InvalidConfig(format!(
                "distance_min must be positive, got {}",
                self.distance_min
            )));
        }
        let scale = match self.link_scale {
            LinkScale::Relative(f) | LinkScale::Absolute(f) => f,
        };
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(LayoutError::InvalidConfig(format!(
                "link_scale must be positive, got {:?}",
                self.link_scale
            )));
        }
        if !(self.theta > 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "theta must be positive, got {}",
                self.theta
            )));
        }
        Ok(())
    }
}

/// Which placement strategy produced a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStrategy {
    /// No domains.
    Empty,
    /// Every domain already had a position.
    Reuse,
    /// A lone unpositioned domain placed at the center.
    Single,
    /// Force relaxation.
    ForceDirected,
    /// Evenly spaced on a circle.
    Circular,
}

impl LayoutStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            LayoutStrategy::Empty => "empty",
            LayoutStrategy::Reuse => "reuse",
            LayoutStrategy::Single => "single",
            LayoutStrategy::ForceDirected => "force-directed",
            LayoutStrategy::Circular => "circular",
        }
    }

    /// Whether this strategy may have moved domains relative to their input.
    pub fn moves_domains(&self) -> bool {
        !matches!(self, LayoutStrategy::Empty | LayoutStrategy::Reuse)
    }
}

/// Result of [`compute_layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutcome {
    /// Positioned domains in input order.
    pub domains: Vec<PositionedDomain>,
    pub strategy: LayoutStrategy,
    /// Relaxation steps run (0 for non-iterative strategies).
    pub iterations: u32,
    /// Whether relaxation stopped on the convergence test.
    pub converged: bool,
    /// Links that took part in relaxation.
    pub links: usize,
    /// Distance entries ignored while building links.
    pub dropped_links: usize,
}

impl LayoutOutcome {
    fn placed(domains: Vec<PositionedDomain>, strategy: LayoutStrategy) -> Self {
        Self {
            domains,
            strategy,
            iterations: 0,
            converged: true,
            links: 0,
            dropped_links: 0,
        }
    }

    /// Positions keyed by id, suitable as `previous` for the next run.
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot::from_positioned(&self.domains)
    }
}

/// Compute a position for every domain on a `width` x `height` canvas.
///
/// Positions from `previous` take precedence over the domains' cached
/// coordinates; either is ignored when it falls outside the canvas. Strategy order: empty, reuse, single, force relaxation
/// (when a link resolves or some domains are already placed), circular.
pub fn compute_layout(
    domains: &[Domain],
    distances: &DistanceMap,
    width: f64,
    height: f64,
    previous: Option<&LayoutSnapshot>,
    config: &LayoutConfig,
) -> Result<LayoutOutcome> {
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(LayoutError::InvalidCanvas { width, height });
    }
    config.validate()?;

    if domains.is_empty() {
        return Ok(LayoutOutcome::placed(Vec::new(), LayoutStrategy::Empty));
    }

    // Positions left over from a larger canvas are re-seeded, not reused.
    let canvas = Rect::from_size(width, height);
    let on_canvas = |p: &Point| canvas.contains(*p);
    let resolved: Vec<Option<Point>> = domains
        .iter()
        .map(|d| {
            previous
                .and_then(|s| s.get(&d.id))
                .filter(on_canvas)
                .or_else(|| d.position().filter(on_canvas))
        })
        .collect();
    let off_canvas = domains
        .iter()
        .zip(&resolved)
        .filter(|(d, r)| {
            r.is_none()
                && (d.position().is_some() || previous.is_some_and(|s| s.get(&d.id).is_some()))
        })
        .count();
    if off_canvas > 0 {
        debug!(off_canvas, width, height, "Ignoring positions outside the canvas");
    }

    if resolved.iter().all(Option::is_some) {
        debug!(count = domains.len(), "Reusing existing positions");
        let placed = domains
            .iter()
            .zip(resolved.iter().flatten())
            .map(|(d, &p)| PositionedDomain::new(d, p))
            .collect();
        return Ok(LayoutOutcome::placed(placed, LayoutStrategy::Reuse));
    }

    if domains.len() == 1 {
        let p = clamp_to_margin(canvas.center(), width, height, config.margin);
        return Ok(LayoutOutcome::placed(
            vec![PositionedDomain::new(&domains[0], p)],
            LayoutStrategy::Single,
        ));
    }

    let link_set = build_links(domains, distances, config.link_scale.pixels(width, height));
    let any_positioned = resolved.iter().any(Option::is_some);

    let outcome = if link_set.is_empty() && !any_positioned {
        let placed = circular_positions(domains.len(), width, height, config.circle_divisor)
            .into_iter()
            .zip(domains)
            .map(|(p, d)| PositionedDomain::new(d, clamp_to_margin(p, width, height, config.margin)))
            .collect();
        LayoutOutcome {
            dropped_links: link_set.dropped,
            ..LayoutOutcome::placed(placed, LayoutStrategy::Circular)
        }
    } else {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let seeds: Vec<Point> = resolved
            .iter()
            .map(|p| p.unwrap_or_else(|| random_point(&mut rng, width, height, config.margin)))
            .collect();

        let link_count = link_set.links.len();
        let mut sim = ForceSimulation::new(seeds, link_set.links, canvas.center(), config, rng);
        let state = sim.run();
        let iterations = sim.iteration();

        let placed = sim
            .into_positions()
            .into_iter()
            .zip(domains)
            .map(|(p, d)| PositionedDomain::new(d, clamp_to_margin(p, width, height, config.margin)))
            .collect();

        LayoutOutcome {
            domains: placed,
            strategy: LayoutStrategy::ForceDirected,
            iterations,
            converged: state == SimulationState::Converged,
            links: link_count,
            dropped_links: link_set.dropped,
        }
    };

    info!(
        strategy = outcome.strategy.label(),
        domains = domains.len(),
        links = outcome.links,
        iterations = outcome.iterations,
        converged = outcome.converged,
        "Computed layout"
    );

    Ok(outcome)
}

/// `n` points evenly spaced on a circle around the canvas center.
///
/// The `i`-th point sits at angle `2π·i/n`, radius `min(width, height) / divisor`.
pub fn circular_positions(n: usize, width: f64, height: f64, divisor: f64) -> Vec<Point> {
    let center = Rect::from_size(width, height).center();
    let radius = width.min(height) / divisor;
    (0..n)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / n as f64;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

/// Clamp `p` into `[margin, dimension - margin]` on both axes.
///
/// An axis narrower than `2 * margin` collapses to its center.
pub fn clamp_to_margin(p: Point, width: f64, height: f64, margin: f64) -> Point {
    Point::new(
        clamp_axis(p.x, width, margin),
        clamp_axis(p.y, height, margin),
    )
}

fn clamp_axis(v: f64, dim: f64, margin: f64) -> f64 {
    if dim <= 2.0 * margin || !v.is_finite() {
        return dim / 2.0;
    }
    v.clamp(margin, dim - margin)
}

fn random_point(rng: &mut StdRng, width: f64, height: f64, margin: f64) -> Point {
    let mut axis = |dim: f64| {
        if dim > 2.0 * margin {
            rng.random_range(margin..dim - margin)
        } else {
            dim / 2.0
        }
    };
    let x = axis(width);
    let y = axis(height);
    Point::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unplaced(ids: &[&str]) -> Vec<Domain> {
        ids.iter().map(|id| Domain::new(*id, id.to_uppercase())).collect()
    }

    fn within_margin(outcome: &LayoutOutcome, w: f64, h: f64) -> bool {
        outcome
            .domains
            .iter()
            .all(|d| d.x >= 50.0 && d.x <= w - 50.0 && d.y >= 50.0 && d.y <= h - 50.0)
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let out = compute_layout(&[], &DistanceMap::new(), 800.0, 600.0, None, &LayoutConfig::default())
            .unwrap();
        assert_eq!(out.strategy, LayoutStrategy::Empty);
        assert!(out.domains.is_empty());
    }

    #[test]
    fn test_invalid_canvas_rejected() {
        let err = compute_layout(
            &unplaced(&["a"]),
            &DistanceMap::new(),
            0.0,
            600.0,
            None,
            &LayoutConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, LayoutError::InvalidCanvas { width: 0.0, height: 600.0 });
    }

    #[test]
    fn test_single_domain_goes_to_center() {
        let out = compute_layout(
            &unplaced(&["solo"]),
            &DistanceMap::new().with("solo", "other", 0.3),
            800.0,
            600.0,
            None,
            &LayoutConfig::default(),
        )
        .unwrap();
        assert_eq!(out.strategy, LayoutStrategy::Single);
        assert_eq!(out.domains[0].point(), Point::new(400.0, 300.0));
    }

    #[test]
    fn test_reuse_returns_positions_unchanged() {
        let domains = vec![
            Domain::new("a", "A").with_position(10.0, 20.0),
            Domain::new("b", "B").with_position(790.0, 5.0),
        ];
        let distances = DistanceMap::new().with("a", "b", 0.1);
        let out = compute_layout(&domains, &distances, 800.0, 600.0, None, &LayoutConfig::default())
            .unwrap();
        assert_eq!(out.strategy, LayoutStrategy::Reuse);
        // reuse does not clamp
        assert_eq!(out.domains[0].point(), Point::new(10.0, 20.0));
        assert_eq!(out.domains[1].point(), Point::new(790.0, 5.0));
    }

    #[test]
    fn test_previous_snapshot_overrides_cached_coordinates() {
        let domains = vec![
            Domain::new("a", "A").with_position(10.0, 20.0),
            Domain::new("b", "B"),
        ];
        let mut snapshot = LayoutSnapshot::new();
        snapshot.insert("b".into(), Point::new(300.0, 300.0));
        snapshot.insert("a".into(), Point::new(100.0, 100.0));
        let out = compute_layout(
            &domains,
            &DistanceMap::new(),
            800.0,
            600.0,
            Some(&snapshot),
            &LayoutConfig::default(),
        )
        .unwrap();
        assert_eq!(out.strategy, LayoutStrategy::Reuse);
        assert_eq!(out.domains[0].point(), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_positions_outside_a_smaller_canvas_are_reseeded() {
        let domains = vec![
            Domain::new("a", "A").with_position(640.0, 300.0),
            Domain::new("b", "B").with_position(280.0, 507.8),
            Domain::new("c", "C").with_position(280.0, 92.2),
        ];
        let out = compute_layout(&domains, &DistanceMap::new(), 300.0, 200.0, None, &LayoutConfig::default())
            .unwrap();
        assert_eq!(out.strategy, LayoutStrategy::ForceDirected);
        assert!(within_margin(&out, 300.0, 200.0));

        let mut snapshot = LayoutSnapshot::new();
        snapshot.insert("a".into(), Point::new(900.0, 50.0));
        let out = compute_layout(
            &[Domain::new("a", "A").with_position(120.0, 80.0)],
            &DistanceMap::new(),
            300.0,
            200.0,
            Some(&snapshot),
            &LayoutConfig::default(),
        )
        .unwrap();
        // falls back to the cached coordinate that still fits
        assert_eq!(out.strategy, LayoutStrategy::Reuse);
        assert_eq!(out.domains[0].point(), Point::new(120.0, 80.0));
    }

    #[test]
    fn test_circular_fallback_angles_and_radius() {
        let ids = ["a", "b", "c", "d", "e"];
        let out = compute_layout(
            &unplaced(&ids),
            &DistanceMap::new(),
            1000.0,
            900.0,
            None,
            &LayoutConfig::default(),
        )
        .unwrap();
        assert_eq!(out.strategy, LayoutStrategy::Circular);
        let center = Point::new(500.0, 450.0);
        for (i, d) in out.domains.iter().enumerate() {
            let v = d.point() - center;
            assert!((v.length() - 360.0).abs() < 1e-9);
            let expected = std::f64::consts::TAU * i as f64 / ids.len() as f64;
            let angle = v.y.atan2(v.x).rem_euclid(std::f64::consts::TAU);
            assert!((angle - expected).abs() < 1e-9, "domain {i}: {angle} vs {expected}");
        }
    }

    #[test]
    fn test_three_domains_on_800_by_600() {
        let out = compute_layout(
            &unplaced(&["A", "B", "C"]),
            &DistanceMap::new(),
            800.0,
            600.0,
            None,
            &LayoutConfig::default(),
        )
        .unwrap();
        let expected = [
            Point::new(640.0, 300.0),
            Point::new(400.0 - 120.0, 300.0 + 240.0 * (3f64.sqrt() / 2.0)),
            Point::new(400.0 - 120.0, 300.0 - 240.0 * (3f64.sqrt() / 2.0)),
        ];
        for (d, e) in out.domains.iter().zip(expected) {
            assert!(d.point().distance(e) < 1e-9, "{:?} vs {:?}", d.point(), e);
        }
        assert!(within_margin(&out, 800.0, 600.0));
    }

    #[test]
    fn test_two_linked_domains_settle_at_target_distance() {
        let out = compute_layout(
            &unplaced(&["x", "y"]),
            &DistanceMap::new().with("x", "y", 1.0),
            800.0,
            600.0,
            None,
            &LayoutConfig::default(),
        )
        .unwrap();
        assert_eq!(out.strategy, LayoutStrategy::ForceDirected);
        assert_eq!(out.links, 1);
        let d = out.domains[0].point().distance(out.domains[1].point());
        // default scale: distance 1.0 == half of min(800, 600)
        assert!((d - 300.0).abs() < 30.0, "separation {d}");
        assert!(within_margin(&out, 800.0, 600.0));
    }

    #[test]
    fn test_comma_bearing_ids_still_link() {
        let out = compute_layout(
            &unplaced(&["Physics, Applied", "Biology"]),
            &DistanceMap::new().with("Physics, Applied", "Biology", 1.0),
            800.0,
            600.0,
            None,
            &LayoutConfig::default(),
        )
        .unwrap();
        assert_eq!(out.strategy, LayoutStrategy::ForceDirected);
        assert_eq!((out.links, out.dropped_links), (1, 0));
    }

    #[test]
    fn test_relaxation_is_deterministic_for_a_seed() {
        let ids = ["a", "b", "c", "d"];
        let distances = DistanceMap::new()
            .with("a", "b", 0.2)
            .with("b", "c", 0.9)
            .with("c", "d", 0.4)
            .with("a", "d", 0.7);
        let config = LayoutConfig::default();
        let run = || {
            compute_layout(&unplaced(&ids), &distances, 800.0, 600.0, None, &config).unwrap()
        };
        assert_eq!(run().domains, run().domains);
    }

    #[test]
    fn test_margin_holds_for_crowded_relaxation() {
        let ids: Vec<String> = (0..25).map(|i| format!("d{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut distances = DistanceMap::new();
        for i in 0..refs.len() {
            for j in (i + 1)..refs.len() {
                distances.insert(refs[i], refs[j], ((i * 7 + j * 3) % 10) as f64 / 10.0);
            }
        }
        let out = compute_layout(&unplaced(&refs), &distances, 640.0, 480.0, None, &LayoutConfig::default())
            .unwrap();
        assert_eq!(out.domains.len(), 25);
        assert!(within_margin(&out, 640.0, 480.0));
    }

    #[test]
    fn test_added_domain_without_distances_keeps_others_as_seeds() {
        let domains = vec![
            Domain::new("a", "A").with_position(200.0, 300.0),
            Domain::new("b", "B").with_position(600.0, 300.0),
            Domain::new("new", "New"),
        ];
        let out = compute_layout(&domains, &DistanceMap::new(), 800.0, 600.0, None, &LayoutConfig::default())
            .unwrap();
        assert_eq!(out.strategy, LayoutStrategy::ForceDirected);
        assert_eq!(out.links, 0);
        assert!(within_margin(&out, 800.0, 600.0));
    }

    #[test]
    fn test_tiny_canvas_collapses_to_center() {
        let p = clamp_to_margin(Point::new(3.0, 70.0), 80.0, 400.0, 50.0);
        assert_eq!(p, Point::new(40.0, 70.0));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = LayoutConfig {
            velocity_decay: 1.5,
            ..LayoutConfig::default()
        };
        assert!(matches!(config.validate(), Err(LayoutError::InvalidConfig(_))));
    }

    #[test]
    fn test_non_finite_forces_and_bad_scale_are_rejected() {
        let bad = [
            LayoutConfig { link_scale: LinkScale::Relative(-0.5), ..LayoutConfig::default() },
            LayoutConfig { link_scale: LinkScale::Absolute(f64::NAN), ..LayoutConfig::default() },
            LayoutConfig { convergence_threshold: f64::NAN, ..LayoutConfig::default() },
            LayoutConfig { repulsion: f64::INFINITY, ..LayoutConfig::default() },
            LayoutConfig { collide_radius: -1.0, ..LayoutConfig::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(LayoutError::InvalidConfig(_))),
                "{config:?} accepted"
            );
        }
        assert!(LayoutConfig::default().validate().is_ok());
    }
}
