//! Domains, their documents and resolved positions.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geometry::Point;

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque identifier of a domain, unique within a sibling set.
///
/// Stores deliver ids either as strings or as integers; both are accepted on
/// input and the id is always written back as a string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DomainId(String);

impl DomainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DomainId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DomainId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for DomainId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for DomainId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for DomainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DomainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_id(deserializer).map(Self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match LenientId::deserialize(deserializer)? {
        LenientId::Text(s) => s,
        LenientId::Unsigned(n) => n.to_string(),
        LenientId::Signed(n) => n.to_string(),
    })
}

// =============================================================================
// Domains
// =============================================================================

/// Reference to a document attached to a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Store identifier of the document.
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    /// Display name (usually the file name).
    #[serde(default)]
    pub name: String,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A node in the knowledge hierarchy as supplied by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    /// Identity of the domain.
    pub id: DomainId,
    /// Human readable name.
    pub name: String,
    /// Parent domain, `None` at the root level.
    #[serde(default)]
    pub parent_id: Option<DomainId>,
    /// Cached layout x coordinate.
    #[serde(default)]
    pub x: Option<f64>,
    /// Cached layout y coordinate.
    #[serde(default)]
    pub y: Option<f64>,
    /// Attached documents, in display order.
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

impl Domain {
    /// Create an unpositioned root-level domain.
    pub fn new(id: impl Into<DomainId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            x: None,
            y: None,
            documents: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<DomainId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_document(mut self, document: DocumentRef) -> Self {
        self.documents.push(document);
        self
    }

    /// The cached position, if it is usable.
    ///
    /// Missing coordinates, non-finite values and the `(0, 0)` sentinel all
    /// mean "not yet positioned".
    pub fn position(&self) -> Option<Point> {
        let p = Point::new(self.x?, self.y?);
        if !p.is_finite() || (p.x == 0.0 && p.y == 0.0) {
            return None;
        }
        Some(p)
    }

    pub fn is_positioned(&self) -> bool {
        self.position().is_some()
    }
}

/// A domain with a resolved layout position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedDomain {
    pub id: DomainId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

impl PositionedDomain {
    pub fn new(domain: &Domain, position: Point) -> Self {
        Self {
            id: domain.id.clone(),
            name: domain.name.clone(),
            x: position.x,
            y: position.y,
            documents: domain.documents.clone(),
        }
    }

    /// Bare positioned site without name or documents.
    pub fn at(id: impl Into<DomainId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            x,
            y,
            documents: Vec::new(),
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

// =============================================================================
// Layout snapshots
// =============================================================================

/// Positions of a previously applied layout, keyed by domain id.
///
/// Passed explicitly into the layout engine so that unrelated re-renders keep
/// every domain where the user last saw it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutSnapshot {
    positions: BTreeMap<DomainId, Point>,
}

impl LayoutSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positioned(domains: &[PositionedDomain]) -> Self {
        Self {
            positions: domains.iter().map(|d| (d.id.clone(), d.point())).collect(),
        }
    }

    pub fn get(&self, id: &DomainId) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn insert(&mut self, id: DomainId, position: Point) {
        self.positions.insert(id, position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_position_is_unset() {
        assert!(Domain::new("a", "A").position().is_none());
        assert!(Domain::new("a", "A").with_position(0.0, 0.0).position().is_none());
        assert!(Domain::new("a", "A")
            .with_position(f64::NAN, 3.0)
            .position()
            .is_none());
        assert_eq!(
            Domain::new("a", "A").with_position(0.0, 12.0).position(),
            Some(Point::new(0.0, 12.0))
        );
    }

    #[test]
    fn test_domain_accepts_integer_ids() {
        let json = r#"{"id": 7, "name": "Physics", "parentId": 2, "x": 10.5, "y": 20.0,
                       "documents": [{"id": 3, "name": "paper.pdf"}]}"#;
        let domain: Domain = serde_json::from_str(json).unwrap();
        assert_eq!(domain.id.as_str(), "7");
        assert_eq!(domain.parent_id, Some(DomainId::from("2")));
        assert_eq!(domain.documents[0].id, "3");
        assert_eq!(domain.position(), Some(Point::new(10.5, 20.0)));

        let back = serde_json::to_value(&domain).unwrap();
        assert_eq!(back["id"], "7");
        assert_eq!(back["parentId"], "2");
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let domain: Domain = serde_json::from_str(r#"{"id": "a", "name": "A"}"#).unwrap();
        assert!(domain.parent_id.is_none());
        assert!(domain.documents.is_empty());
        assert!(!domain.is_positioned());
    }

    #[test]
    fn test_snapshot_roundtrip_from_positioned() {
        let placed = vec![
            PositionedDomain::at("a", 1.0, 2.0),
            PositionedDomain::at("b", 3.0, 4.0),
        ];
        let snapshot = LayoutSnapshot::from_positioned(&placed);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&"b".into()), Some(Point::new(3.0, 4.0)));
        assert_eq!(snapshot.get(&"c".into()), None);
    }
}
