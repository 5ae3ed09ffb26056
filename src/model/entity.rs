//! Entity — a node in the inventory property graph.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PropertyValue;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Entity identifier.
///
/// Generated ids are process-unique (`ent-N` from an atomic counter);
/// ingestion layers may instead supply their own stable ids (e.g. a tag
/// UID). Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Next process-unique generated id.
    pub fn generate() -> Self {
        Self(format!("ent-{}", NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Closed set of entity variants.
///
/// Variants are a discriminator over a common envelope, not separate
/// storage types — typed accessors live in [`super::views`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    PhysicalComponent,
    Identifier,
    Location,
    Person,
    Activity,
    Information,
    Virtual,
    StockDefinition,
    InventoryItem,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::PhysicalComponent => "physical_component",
            EntityType::Identifier => "identifier",
            EntityType::Location => "location",
            EntityType::Person => "person",
            EntityType::Activity => "activity",
            EntityType::Information => "information",
            EntityType::Virtual => "virtual",
            EntityType::StockDefinition => "stock_definition",
            EntityType::InventoryItem => "inventory_item",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle metadata carried by every entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub version: u64,
    pub tags: Vec<String>,
    /// Where the entity came from (scan ingestion, template, calibration).
    pub source: Option<String>,
    /// Percent confidence in the entity's data, 0–100.
    pub confidence: f64,
}

impl EntityMetadata {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            last_modified: now,
            version: 1,
            tags: Vec::new(),
            source: None,
            confidence: 100.0,
        }
    }
}

/// A node in the inventory property graph.
///
/// Entities compare and hash **by id only** — two entities with the same
/// id are the same entity regardless of payload. Property mutation goes
/// through [`Entity::set_property`] / [`Entity::remove_property`], which
/// maintain `last_modified` and `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    pub entity_type: EntityType,
    pub label: String,
    properties: HashMap<String, PropertyValue>,
    pub metadata: EntityMetadata,
}

impl Entity {
    /// Create an entity with a generated id.
    pub fn new(entity_type: EntityType, label: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), entity_type, label)
    }

    /// Create an entity with a caller-supplied stable id.
    pub fn with_id(id: EntityId, entity_type: EntityType, label: impl Into<String>) -> Self {
        Self {
            id,
            entity_type,
            label: label.into(),
            properties: HashMap::new(),
            metadata: EntityMetadata::new(),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    // ------------------------------------------------------------------
    // Builder-style constructors
    // ------------------------------------------------------------------

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.metadata.confidence = confidence;
        self
    }

    // ------------------------------------------------------------------
    // Property access
    // ------------------------------------------------------------------

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &HashMap<String, PropertyValue> {
        &self.properties
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Set a property, updating `last_modified` and bumping `version`.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
        self.touch();
    }

    /// Remove a property. Updates lifecycle metadata only when the key
    /// was present.
    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        let removed = self.properties.remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    fn touch(&mut self) {
        self.metadata.last_modified = Utc::now();
        self.metadata.version += 1;
    }
}

// Identity is the id alone; payload equality is not entity identity.
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] \"{}\"", self.id, self.entity_type, self.label)
    }
}
