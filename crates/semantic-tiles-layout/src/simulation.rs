//! Force simulation used by the relaxation strategy.
//!
//! A velocity-Verlet style integrator in the spirit of d3-force: every step
//! cools `alpha`, accumulates link, many-body and collision contributions into
//! the velocities, integrates with velocity decay, then re-centers the point
//! cloud on the canvas center.

use rand::rngs::StdRng;
use rand::Rng;
use semantic_tiles_core::Point;

use crate::distance::Link;
use crate::layout::LayoutConfig;
use crate::quadtree::QuadTree;

/// Current state of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    /// Still moving.
    Running,
    /// Mean displacement fell below the convergence threshold.
    Converged,
    /// Hit the iteration cap before converging.
    Exhausted,
}

/// Iterative force relaxation over a fixed set of sites and links.
pub struct ForceSimulation {
    config: LayoutConfig,
    positions: Vec<Point>,
    velocities: Vec<Point>,
    links: Vec<Link>,
    /// Per-link spring strength (1 / min degree of its endpoints).
    link_strength: Vec<f64>,
    /// Per-link share of the correction applied to the target.
    link_bias: Vec<f64>,
    center: Point,
    alpha: f64,
    alpha_decay: f64,
    rng: StdRng,
    iteration: u32,
    last_displacement: f64,
    state: SimulationState,
}

impl ForceSimulation {
    /// Create a simulation from seed positions.
    ///
    /// `rng` only breaks ties between coincident sites, so a seeded generator
    /// keeps the whole run reproducible.
    pub fn new(
        seeds: Vec<Point>,
        links: Vec<Link>,
        center: Point,
        config: &LayoutConfig,
        rng: StdRng,
    ) -> Self {
        let n = seeds.len();
        let mut degree = vec![0usize; n];
        for link in &links {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }
        let link_strength = links
            .iter()
            .map(|l| 1.0 / degree[l.source].min(degree[l.target]) as f64)
            .collect();
        let link_bias = links
            .iter()
            .map(|l| {
                let s = degree[l.source] as f64;
                s / (s + degree[l.target] as f64)
            })
            .collect();

        let cooling_steps = f64::from(config.max_iterations.max(1));
        Self {
            config: config.clone(),
            velocities: vec![Point::default(); n],
            positions: seeds,
            links,
            link_strength,
            link_bias,
            center,
            alpha: 1.0,
            alpha_decay: 1.0 - config.alpha_min.powf(1.0 / cooling_steps),
            rng,
            iteration: 0,
            last_displacement: f64::INFINITY,
            state: SimulationState::Running,
        }
    }

    /// Get current state.
    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Get current iteration count.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Current positions.
    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn into_positions(self) -> Vec<Point> {
        self.positions
    }

    /// Mean per-site displacement of the last step.
    pub fn last_displacement(&self) -> f64 {
        self.last_displacement
    }

    /// Run until converged or the iteration cap is reached.
    pub fn run(&mut self) -> SimulationState {
        while self.state == SimulationState::Running {
            self.step();
        }
        self.state
    }

    /// Advance one step. Returns the mean displacement of this step.
    pub fn step(&mut self) -> f64 {
        if self.state != SimulationState::Running {
            return self.last_displacement;
        }
        if self.iteration >= self.config.max_iterations || self.positions.is_empty() {
            self.state = SimulationState::Exhausted;
            return self.last_displacement;
        }

        self.alpha -= self.alpha * self.alpha_decay;

        self.apply_links();
        self.apply_many_body();
        self.apply_collisions();

        let keep = 1.0 - self.config.velocity_decay;
        let mut total = 0.0;
        for (p, v) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            *v = *v * keep;
            *p = *p + *v;
            total += v.length();
        }

        self.apply_centering();

        self.iteration += 1;
        self.last_displacement = total / self.positions.len() as f64;

        if self.iteration >= self.config.min_iterations
            && self.last_displacement < self.config.convergence_threshold
        {
            self.state = SimulationState::Converged;
        } else if self.iteration >= self.config.max_iterations {
            self.state = SimulationState::Exhausted;
        }

        self.last_displacement
    }

    fn jiggle(&mut self) -> f64 {
        (self.rng.random::<f64>() - 0.5) * 1e-6
    }

    fn apply_links(&mut self) {
        for k in 0..self.links.len() {
            let Link {
                source,
                target,
                distance,
            } = self.links[k];
            let mut d = (self.positions[target] + self.velocities[target])
                - (self.positions[source] + self.velocities[source]);
            if d.x == 0.0 && d.y == 0.0 {
                d = Point::new(self.jiggle(), self.jiggle());
            }
            let l = d.length();
            let correction = (l - distance) / l * self.alpha * self.link_strength[k];
            let d = d * correction;
            let bias = self.link_bias[k];
            self.velocities[target] = self.velocities[target] - d * bias;
            self.velocities[source] = self.velocities[source] + d * (1.0 - bias);
        }
    }

    fn apply_many_body(&mut self) {
        let strength = -self.config.repulsion;
        let n = self.positions.len();
        if n < 2 || strength == 0.0 {
            return;
        }

        if self.config.use_barnes_hut && n > self.config.barnes_hut_threshold {
            let tree = QuadTree::build(&self.positions, self.config.max_tree_depth);
            for i in 0..n {
                let f = tree.force_at(
                    self.positions[i],
                    strength,
                    self.config.theta,
                    self.config.distance_min,
                );
                self.velocities[i] = self.velocities[i] + f * self.alpha;
            }
            return;
        }

        let min2 = self.config.distance_min * self.config.distance_min;
        for i in 0..n {
            let mut acc = Point::default();
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = self.positions[j] - self.positions[i];
                let mut l2 = d.x * d.x + d.y * d.y;
                if l2 == 0.0 {
                    continue;
                }
                if l2 < min2 {
                    l2 = (min2 * l2).sqrt();
                }
                acc = acc + d * (strength / l2);
            }
            self.velocities[i] = self.velocities[i] + acc * self.alpha;
        }
    }

    fn apply_collisions(&mut self) {
        let r = 2.0 * self.config.collide_radius;
        if r <= 0.0 {
            return;
        }
        let n = self.positions.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let pi = self.positions[i] + self.velocities[i];
                let pj = self.positions[j] + self.velocities[j];
                let mut d = pi - pj;
                if d.x == 0.0 && d.y == 0.0 {
                    d = Point::new(self.jiggle(), self.jiggle());
                }
                let l = d.length();
                if l >= r {
                    continue;
                }
                let push = d * ((r - l) / l * self.config.collide_strength * 0.5);
                self.velocities[i] = self.velocities[i] + push;
                self.velocities[j] = self.velocities[j] - push;
            }
        }
    }

    fn apply_centering(&mut self) {
        let n = self.positions.len() as f64;
        let sum = self
            .positions
            .iter()
            .fold(Point::default(), |acc, &p| acc + p);
        let shift = (self.center - sum * (1.0 / n)) * self.config.center_strength;
        for p in &mut self.positions {
            *p = *p + shift;
        }
    }
}
