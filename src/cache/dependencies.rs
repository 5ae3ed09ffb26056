//! Dependency extraction and change detection for derived entities.
//!
//! A derived entity (decoded metadata, decrypted payload, interpreted
//! product info) stays valid only while every independent input it was
//! computed from stays unchanged: the source entity's content, the
//! external catalog version, referenced config files, external data
//! sources, and the versions of the algorithms involved. A
//! [`DependencySet`] fingerprints all of them; field-wise inequality is
//! the sole invalidation signal.
//!
//! All fingerprinting iterates properties in sorted key order so the
//! result is independent of map iteration order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{keys, Entity, EntityId, PropertyValue};

// ============================================================================
// Derivation kinds
// ============================================================================

/// What was derived from the source entity.
///
/// Each kind has its own catalog relevance, config files, external data
/// sources, and algorithm version identifiers, so bumping the decryptor
/// version never invalidates plain tag decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationKind {
    /// Raw tag bytes → structured tag metadata.
    TagDecode,
    /// Encrypted tag payload → plaintext payload.
    PayloadDecrypt,
    /// Tag/payload data → product and filament info via the vendor catalog.
    ProductInterpret,
}

impl DerivationKind {
    pub const ALL: [DerivationKind; 3] = [
        DerivationKind::TagDecode,
        DerivationKind::PayloadDecrypt,
        DerivationKind::ProductInterpret,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DerivationKind::TagDecode => "tag_decode",
            DerivationKind::PayloadDecrypt => "payload_decrypt",
            DerivationKind::ProductInterpret => "product_interpret",
        }
    }

    /// Only product interpretation reads the vendor catalog.
    pub fn consumes_catalog(&self) -> bool {
        matches!(self, DerivationKind::ProductInterpret)
    }

    /// Config files whose content this derivation depends on.
    pub fn config_files(&self) -> &'static [&'static str] {
        match self {
            DerivationKind::TagDecode => &["tag_formats.toml"],
            DerivationKind::PayloadDecrypt => &["decryption_keys.toml"],
            DerivationKind::ProductInterpret => {
                &["catalog_overrides.toml", "material_aliases.toml"]
            }
        }
    }

    /// External data sources this derivation reads.
    pub fn data_sources(&self) -> &'static [&'static str] {
        match self {
            DerivationKind::TagDecode => &[],
            DerivationKind::PayloadDecrypt => &["key_registry"],
            DerivationKind::ProductInterpret => &["vendor_catalog"],
        }
    }

    /// Algorithms whose version identifiers this derivation depends on.
    pub fn algorithms(&self) -> &'static [&'static str] {
        match self {
            DerivationKind::TagDecode => &["tag_decoder"],
            DerivationKind::PayloadDecrypt => &["payload_decryptor"],
            DerivationKind::ProductInterpret => &["catalog_interpreter"],
        }
    }
}

impl fmt::Display for DerivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Providers (out-of-scope collaborators, injected)
// ============================================================================

/// Exposes one current fingerprint string for the whole external catalog.
/// The core never parses catalog content.
pub trait CatalogProvider: Send + Sync {
    fn version(&self) -> Option<String>;
}

/// Exposes per-file content hashes for named config files.
pub trait ConfigProvider: Send + Sync {
    fn content_hash(&self, name: &str) -> Option<String>;
}

/// Exposes version identifiers for named algorithms.
pub trait AlgorithmVersions: Send + Sync {
    fn version(&self, algorithm: &str) -> Option<String>;
}

// ============================================================================
// DependencySet
// ============================================================================

/// Fields a [`DependencySet`] can differ in. Diagnostics only — any one
/// differing field invalidates the whole entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyField {
    SourceId,
    ContentFingerprint,
    CatalogVersion,
    ConfigHashes,
    DataSources,
    AlgorithmVersions,
}

/// Fingerprints of everything a derived entity was computed from.
///
/// `computed_at` records when the set was captured and is excluded from
/// equality — two sets built from identical inputs at different times
/// are the same dependency set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencySet {
    pub source_id: EntityId,
    /// 16-hex-char truncated hash of the source's canonical content.
    pub content_fingerprint: String,
    pub catalog_version: Option<String>,
    pub config_hashes: BTreeMap<String, String>,
    pub data_sources: BTreeSet<String>,
    pub algorithm_versions: BTreeMap<String, String>,
    pub computed_at: DateTime<Utc>,
}

impl DependencySet {
    /// Fields in which `self` and `other` differ. Empty means the sets
    /// are interchangeable for cache validity.
    pub fn diff(&self, other: &DependencySet) -> Vec<DependencyField> {
        let mut changed = Vec::new();
        if self.source_id != other.source_id {
            changed.push(DependencyField::SourceId);
        }
        if self.content_fingerprint != other.content_fingerprint {
            changed.push(DependencyField::ContentFingerprint);
        }
        if self.catalog_version != other.catalog_version {
            changed.push(DependencyField::CatalogVersion);
        }
        if self.config_hashes != other.config_hashes {
            changed.push(DependencyField::ConfigHashes);
        }
        if self.data_sources != other.data_sources {
            changed.push(DependencyField::DataSources);
        }
        if self.algorithm_versions != other.algorithm_versions {
            changed.push(DependencyField::AlgorithmVersions);
        }
        changed
    }
}

impl PartialEq for DependencySet {
    fn eq(&self, other: &Self) -> bool {
        self.diff(other).is_empty()
    }
}

impl Eq for DependencySet {}

/// Outcome of re-validating a cached [`DependencySet`] against current
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    pub changed: Vec<DependencyField>,
}

impl ChangeReport {
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }
}

// ============================================================================
// Fingerprinting
// ============================================================================

/// Hash a canonical string down to a 16-hex-char fingerprint.
pub(crate) fn hash16(s: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Render a value deterministically for hashing. NaN floats render as
/// `NaN` (present, not skipped); bytes render by content hash so byte
/// changes always surface.
fn render_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Null => "null".to_string(),
        PropertyValue::Bool(b) => b.to_string(),
        PropertyValue::Int(i) => i.to_string(),
        PropertyValue::Long(i) => i.to_string(),
        PropertyValue::Float(f) => {
            if f.is_nan() { "NaN".to_string() } else { format!("{f:?}") }
        }
        PropertyValue::Double(f) => {
            if f.is_nan() { "NaN".to_string() } else { format!("{f:?}") }
        }
        PropertyValue::Text(s) => s.clone(),
        PropertyValue::Bytes(b) => {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            b.hash(&mut hasher);
            format!("bytes:{}:{:016x}", b.len(), hasher.finish())
        }
        PropertyValue::List(items) => {
            let parts: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", parts.join(","))
        }
        PropertyValue::Map(m) => {
            let mut keys: Vec<&String> = m.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .iter()
                .map(|k| format!("{}:{}", k, render_value(&m[*k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        PropertyValue::Date(d) => d.to_string(),
        PropertyValue::DateTime(dt) => dt.to_rfc3339(),
        PropertyValue::Quantity(q) => format!("{}:{}", q.value, q.unit),
    }
}

/// Append all properties in sorted key order.
fn append_sorted_properties(parts: &mut Vec<String>, source: &Entity) {
    let mut prop_keys: Vec<&String> = source.properties().keys().collect();
    prop_keys.sort();
    for key in prop_keys {
        parts.push(format!("{}={}", key, render_value(&source.properties()[key])));
    }
}

/// Full content fingerprint of a source entity: id, label, raw-scan
/// payload and declared content hash when present, then every property
/// in sorted key order.
pub fn content_fingerprint(source: &Entity) -> String {
    let mut parts = vec![source.id().to_string(), source.label.clone()];
    if let Some(payload) = source.property(keys::RAW_PAYLOAD) {
        parts.push(format!("payload={}", render_value(payload)));
    }
    if let Some(declared) = source.property(keys::CONTENT_HASH).and_then(|v| v.as_text()) {
        parts.push(format!("declared={declared}"));
    }
    append_sorted_properties(&mut parts, source);
    hash16(&parts.join("|"))
}

/// Cheap fingerprint used on the cache hit path: source id, derivation
/// kind, label, and sorted properties — no provider lookups.
pub fn minimal_fingerprint(source: &Entity, kind: DerivationKind) -> String {
    let mut parts = vec![
        source.id().to_string(),
        kind.as_str().to_string(),
        source.label.clone(),
    ];
    append_sorted_properties(&mut parts, source);
    hash16(&parts.join("|"))
}

// ============================================================================
// DependencyTracker
// ============================================================================

/// Builds and re-validates [`DependencySet`]s against injected providers.
///
/// Providers left unset contribute absent fields, which still compare —
/// a catalog appearing later reads as a change.
#[derive(Clone, Default)]
pub struct DependencyTracker {
    catalog: Option<Arc<dyn CatalogProvider>>,
    config: Option<Arc<dyn ConfigProvider>>,
    algorithms: Option<Arc<dyn AlgorithmVersions>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, provider: Arc<dyn CatalogProvider>) -> Self {
        self.catalog = Some(provider);
        self
    }

    pub fn with_config(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.config = Some(provider);
        self
    }

    pub fn with_algorithms(mut self, provider: Arc<dyn AlgorithmVersions>) -> Self {
        self.algorithms = Some(provider);
        self
    }

    /// Capture the full dependency set for deriving `kind` from `source`.
    pub fn extract(&self, kind: DerivationKind, source: &Entity) -> DependencySet {
        let catalog_version = if kind.consumes_catalog() {
            self.catalog.as_ref().and_then(|c| c.version())
        } else {
            None
        };

        let mut config_hashes = BTreeMap::new();
        if let Some(config) = &self.config {
            for name in kind.config_files() {
                if let Some(hash) = config.content_hash(name) {
                    config_hashes.insert((*name).to_string(), hash);
                }
            }
        }

        let data_sources: BTreeSet<String> =
            kind.data_sources().iter().map(|s| (*s).to_string()).collect();

        let mut algorithm_versions = BTreeMap::new();
        if let Some(algorithms) = &self.algorithms {
            for name in kind.algorithms() {
                if let Some(version) = algorithms.version(name) {
                    algorithm_versions.insert((*name).to_string(), version);
                }
            }
        }

        DependencySet {
            source_id: source.id().clone(),
            content_fingerprint: content_fingerprint(source),
            catalog_version,
            config_hashes,
            data_sources,
            algorithm_versions,
            computed_at: Utc::now(),
        }
    }

    /// Re-validate a cached set against current state. Reports which
    /// fields changed; any single change invalidates the entry.
    pub fn has_changed(
        &self,
        cached: &DependencySet,
        kind: DerivationKind,
        source: &Entity,
    ) -> ChangeReport {
        let current = self.extract(kind, source);
        let changed = current.diff(cached);
        if !changed.is_empty() {
            debug!(
                source = %source.id(),
                kind = %kind,
                ?changed,
                "dependency set changed",
            );
        }
        ChangeReport { changed }
    }
}

impl fmt::Debug for DependencyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("catalog", &self.catalog.is_some())
            .field("config", &self.config.is_some())
            .field("algorithms", &self.algorithms.is_some())
            .finish()
    }
}
