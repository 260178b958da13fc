//! Lays out a synthetic sibling set and prints where each domain landed.
//!
//! Run with: cargo run -p semantic-tiles-layout --example simple_layout

use std::time::Instant;

use semantic_tiles_core::{DistanceMap, Domain};
use semantic_tiles_layout::{compute_layout, LayoutConfig};

fn main() {
    tracing_subscriber::fmt::init();

    let topics = [
        "Algebra",
        "Geometry",
        "Topology",
        "Mechanics",
        "Optics",
        "Thermodynamics",
        "Genetics",
        "Ecology",
    ];
    let domains: Vec<Domain> = topics
        .iter()
        .enumerate()
        .map(|(i, name)| Domain::new(i as u64, *name))
        .collect();

    // Three loose clusters: maths, physics, biology
    let cluster = |i: usize| match i {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    };
    let mut distances = DistanceMap::new();
    for i in 0..domains.len() {
        for j in (i + 1)..domains.len() {
            let d = if cluster(i) == cluster(j) { 0.2 } else { 0.9 };
            distances.insert(domains[i].id.clone(), domains[j].id.clone(), d);
        }
    }

    let config = LayoutConfig::default();
    let start = Instant::now();
    let outcome = compute_layout(&domains, &distances, 800.0, 600.0, None, &config)
        .expect("Layout failed");
    let elapsed = start.elapsed();

    println!(
        "Strategy: {} ({} links, {} iterations, converged: {}) in {:.2?}",
        outcome.strategy.label(),
        outcome.links,
        outcome.iterations,
        outcome.converged,
        elapsed
    );
    for d in &outcome.domains {
        println!("  {:<16} ({:>6.1}, {:>6.1})", d.name, d.x, d.y);
    }
}
