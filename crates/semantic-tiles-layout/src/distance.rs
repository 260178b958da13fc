//! Distance model: turns a sparse distance map into spring links.

use std::collections::{HashMap, HashSet};

use semantic_tiles_core::{resolve_pair_key, DistanceMap, Domain};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a raw `[0, 1]` distance is scaled into a spring length in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LinkScale {
    /// Fraction of `min(width, height)`.
    Relative(f64),
    /// Fixed number of pixels per unit of distance.
    Absolute(f64),
}

impl Default for LinkScale {
    fn default() -> Self {
        // distance 1.0 spans half the smaller canvas dimension
        LinkScale::Relative(0.5)
    }
}

impl LinkScale {
    /// Pixels per unit of distance for a canvas of the given size.
    pub fn pixels(&self, width: f64, height: f64) -> f64 {
        match *self {
            LinkScale::Relative(f) => f * width.min(height),
            LinkScale::Absolute(px) => px,
        }
    }
}

/// A spring between two domains, by index into the domain sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    /// Target length in pixels.
    pub distance: f64,
}

/// Links resolved from a distance map plus the number of ignored entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSet {
    pub links: Vec<Link>,
    /// Entries that were unparsable, self-referencing, duplicated, non-finite
    /// or referenced a domain outside the sibling set.
    pub dropped: usize,
}

impl LinkSet {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }
}

/// Resolve `distances` against `domains` into spring links.
///
/// Entries naming unknown domains are dropped silently: distance data may
/// still reference domains that were deleted or are not loaded yet. Raw
/// values are clamped into `[0, 1]` before scaling by `pixels_per_unit`.
pub fn build_links(domains: &[Domain], distances: &DistanceMap, pixels_per_unit: f64) -> LinkSet {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(domains.len());
    for (i, domain) in domains.iter().enumerate() {
        index.entry(domain.id.as_str()).or_insert(i);
    }

    let mut seen = HashSet::new();
    let mut set = LinkSet::default();

    for (key, raw) in distances.raw_entries() {
        let Some((a, b)) = resolve_pair_key(key, |id| index.contains_key(id)) else {
            set.dropped += 1;
            continue;
        };
        let (Some(&ia), Some(&ib)) = (index.get(a.as_str()), index.get(b.as_str())) else {
            set.dropped += 1;
            continue;
        };
        let pair = (ia.min(ib), ia.max(ib));
        if ia == ib || !raw.is_finite() || !seen.insert(pair) {
            set.dropped += 1;
            continue;
        }
        set.links.push(Link {
            source: pair.0,
            target: pair.1,
            distance: raw.clamp(0.0, 1.0) * pixels_per_unit,
        });
    }

    set.links.sort_by_key(|l| (l.source, l.target));

    if set.dropped > 0 {
        debug!(
            dropped = set.dropped,
            kept = set.links.len(),
            "Ignored distance entries outside the sibling set"
        );
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains(ids: &[&str]) -> Vec<Domain> {
        ids.iter().map(|id| Domain::new(*id, id.to_uppercase())).collect()
    }

    #[test]
    fn test_unknown_ids_are_filtered() {
        let ds = domains(&["a", "b", "c"]);
        let map = DistanceMap::new()
            .with("a", "b", 0.5)
            .with("a", "ghost", 0.1)
            .with("c", "b", 1.0);
        let set = build_links(&ds, &map, 400.0);
        assert_eq!(set.dropped, 1);
        assert_eq!(
            set.links,
            vec![
                Link { source: 0, target: 1, distance: 200.0 },
                Link { source: 1, target: 2, distance: 400.0 },
            ]
        );
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let ds = domains(&["a", "b", "c"]);
        let map = DistanceMap::new().with("a", "b", 1.7).with("a", "c", -0.2);
        let set = build_links(&ds, &map, 100.0);
        assert_eq!(set.links[0].distance, 100.0);
        assert_eq!(set.links[1].distance, 0.0);
    }

    #[test]
    fn test_duplicate_orientation_and_nan_dropped() {
        let ds = domains(&["a", "b"]);
        let mut map = DistanceMap::new();
        map.insert_raw("a,b", 0.2);
        map.insert_raw("b,a", 0.9);
        map.insert_raw("('a', 'b')", f64::NAN);
        let set = build_links(&ds, &map, 10.0);
        assert_eq!(set.len(), 1);
        assert_eq!(set.dropped, 2);
        // "('a', 'b')" sorts first but is NaN, so "a,b" is the first valid orientation
        assert!((set.links[0].distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ids_containing_commas_resolve() {
        let ds = domains(&["Physics, Applied", "Biology", "Chemistry"]);
        let mut map = DistanceMap::new().with("Physics, Applied", "Biology", 1.0);
        // written by hand without quoting
        map.insert_raw("Chemistry,Physics, Applied", 0.5);
        let set = build_links(&ds, &map, 100.0);
        assert_eq!(set.dropped, 0);
        assert_eq!(
            set.links,
            vec![
                Link { source: 0, target: 1, distance: 100.0 },
                Link { source: 0, target: 2, distance: 50.0 },
            ]
        );
    }

    #[test]
    fn test_link_scale_default_is_half_min_dimension() {
        assert_eq!(LinkScale::default().pixels(800.0, 600.0), 300.0);
        assert_eq!(LinkScale::Absolute(120.0).pixels(800.0, 600.0), 120.0);
    }
}
