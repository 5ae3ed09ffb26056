//! Edge — a typed, optionally directional relationship between entities.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, PropertyValue};

static NEXT_EDGE_ID: AtomicU64 = AtomicU64::new(1);

/// Edge identifier. Generated, process-unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("edge-{}", NEXT_EDGE_ID.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Metadata carried by every edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub weight: f64,
    /// Percent confidence in the relationship, 0–100.
    pub confidence: f64,
    pub source: Option<String>,
}

impl EdgeMetadata {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            last_modified: now,
            weight: 1.0,
            confidence: 100.0,
            source: None,
        }
    }
}

/// A typed relationship between two entities.
///
/// `directional == true` means the edge reads `from → to`; non-directional
/// edges connect both ways. Relationship types are plain strings
/// (`tracks`, `identifiedBy`, `hadMovement`, …).
///
/// Edges compare and hash **by id only**; [`Edge::is_equivalent`] is the
/// structural comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    id: EdgeId,
    pub from: EntityId,
    pub to: EntityId,
    pub relationship_type: String,
    pub directional: bool,
    properties: HashMap<String, PropertyValue>,
    pub metadata: EdgeMetadata,
}

impl Edge {
    /// Create a directional edge with a generated id.
    pub fn new(from: EntityId, to: EntityId, relationship_type: impl Into<String>) -> Self {
        Self {
            id: EdgeId::generate(),
            from,
            to,
            relationship_type: relationship_type.into(),
            directional: true,
            properties: HashMap::new(),
            metadata: EdgeMetadata::new(),
        }
    }

    /// Create a non-directional edge with a generated id.
    pub fn undirected(from: EntityId, to: EntityId, relationship_type: impl Into<String>) -> Self {
        let mut edge = Self::new(from, to, relationship_type);
        edge.directional = false;
        edge
    }

    /// Create a directional edge with a caller-supplied id.
    pub fn with_id(
        id: EdgeId,
        from: EntityId,
        to: EntityId,
        relationship_type: impl Into<String>,
    ) -> Self {
        let mut edge = Self::new(from, to, relationship_type);
        edge.id = id;
        edge
    }

    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.metadata.weight = weight;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.metadata.confidence = confidence;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &HashMap<String, PropertyValue> {
        &self.properties
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
        self.metadata.last_modified = Utc::now();
    }

    /// Structural validity: non-blank endpoints, non-blank relationship
    /// type, no self-reference.
    pub fn validate(&self) -> bool {
        !self.from.is_blank()
            && !self.to.is_blank()
            && !self.relationship_type.trim().is_empty()
            && self.from != self.to
    }

    /// True if the edge touches the given entity at either end.
    pub fn involves(&self, id: &EntityId) -> bool {
        self.from == *id || self.to == *id
    }

    /// The other endpoint, or `None` if the edge does not involve `id`.
    pub fn other_end(&self, id: &EntityId) -> Option<&EntityId> {
        if self.from == *id {
            Some(&self.to)
        } else if self.to == *id {
            Some(&self.from)
        } else {
            None
        }
    }

    /// Structural equivalence: same type, same directionality, same
    /// properties, same endpoint pair. The pair comparison ignores order
    /// for non-directional edges.
    pub fn is_equivalent(&self, other: &Edge) -> bool {
        if self.relationship_type != other.relationship_type
            || self.directional != other.directional
            || self.properties != other.properties
        {
            return false;
        }
        let same = self.from == other.from && self.to == other.to;
        if self.directional {
            same
        } else {
            same || (self.from == other.to && self.to == other.from)
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = if self.directional { "->" } else { "--" };
        write!(f, "({}) -[{}]{} ({})", self.from, self.relationship_type, arrow, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_self_reference() {
        let e = Edge::new("a".into(), "a".into(), "tracks");
        assert!(!e.validate());
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(!Edge::new("".into(), "b".into(), "tracks").validate());
        assert!(!Edge::new("a".into(), "  ".into(), "tracks").validate());
        assert!(!Edge::new("a".into(), "b".into(), "").validate());
        assert!(Edge::new("a".into(), "b".into(), "tracks").validate());
    }

    #[test]
    fn test_equivalence_ignores_endpoint_order_when_undirected() {
        let forward = Edge::undirected("a".into(), "b".into(), "adjacentTo");
        let backward = Edge::undirected("b".into(), "a".into(), "adjacentTo");
        assert!(forward.is_equivalent(&backward));

        let directed_forward = Edge::new("a".into(), "b".into(), "tracks");
        let directed_backward = Edge::new("b".into(), "a".into(), "tracks");
        assert!(!directed_forward.is_equivalent(&directed_backward));
    }

    #[test]
    fn test_equivalence_compares_properties() {
        let plain = Edge::new("a".into(), "b".into(), "hadMovement");
        let weighted = Edge::new("a".into(), "b".into(), "hadMovement")
            .with_property("amount", 15.0);
        assert!(!plain.is_equivalent(&weighted));
    }

    #[test]
    fn test_other_end() {
        let e = Edge::new("a".into(), "b".into(), "tracks");
        assert_eq!(e.other_end(&"a".into()), Some(&EntityId::new("b")));
        assert_eq!(e.other_end(&"b".into()), Some(&EntityId::new("a")));
        assert_eq!(e.other_end(&"c".into()), None);
    }
}
