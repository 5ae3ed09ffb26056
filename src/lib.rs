//! # stocktrace — Typed Inventory Graph with Derivation Caching
//!
//! An in-memory property graph for physical inventory (RFID-scanned
//! spools, trays, components) plus a content-addressed cache for the
//! expensive interpretations of raw scan data.
//!
//! ## Design Principles
//!
//! 1. **Clean DTOs**: `Entity`, `Edge`, `PropertyValue` cross all boundaries
//! 2. **Views, not subclasses**: entity variants are typed accessors over one envelope
//! 3. **Failures are values**: structural rejections are booleans, domain failures are `Error`
//! 4. **Injected collaborators**: catalog/config providers and the clock are trait objects
//!
//! ## Quick Start
//!
//! ```rust
//! use stocktrace::{
//!     DependencyTracker, DerivationKind, Edge, Entity, EntityCacheManager,
//!     EntityType, Graph,
//! };
//!
//! # fn example() -> stocktrace::Result<()> {
//! // Build the graph.
//! let mut graph = Graph::new();
//! let tray = Entity::new(EntityType::Virtual, "tray A")
//!     .with_property("virtual_type", "filament_tray");
//! let spool = Entity::new(EntityType::InventoryItem, "black PETG");
//! let (tray_id, spool_id) = (tray.id().clone(), spool.id().clone());
//! graph.add_entity(tray);
//! graph.add_entity(spool);
//! graph.add_edge(Edge::new(tray_id, spool_id, "tracks"));
//!
//! // Derive lazily, cache until the source or its dependencies change.
//! let cache = EntityCacheManager::new(DependencyTracker::new());
//! let tag = Entity::new(EntityType::Identifier, "spool tag");
//! let decoded = cache.get_or_generate(&tag, DerivationKind::TagDecode, |source| {
//!     Ok(Entity::new(EntityType::Information, format!("decoded {}", source.label)))
//! })?;
//! # let _ = decoded;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod graph;
pub mod cache;
pub mod inventory;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    keys, ActivityView, Edge, EdgeId, EdgeMetadata, Entity, EntityId, EntityMetadata,
    EntityType, IdentifierView, InventoryItemView, PropertyValue, Quantity,
    StockDefinitionView, TrackingMode, VirtualView,
};

// ============================================================================
// Re-exports: Graph
// ============================================================================

pub use graph::Graph;

// ============================================================================
// Re-exports: Derivation cache
// ============================================================================

pub use cache::{
    AlgorithmVersions, CacheStats, CatalogProvider, ChangeReport, Clock, ConfigProvider,
    DependencyField, DependencySet, DependencyTracker, DerivationKind, EntityCacheManager,
    FingerprintedCacheEntry, ManualClock, SystemClock,
};

// ============================================================================
// Re-exports: Inventory inference
// ============================================================================

pub use inventory::{
    apply_weight_reading, calibrate, calibrate_item, distribute, infer_from_quantity,
    infer_from_weight, record_consumption, Calibration, DistributionStrategy, Share,
    WeightEstimate, WeightInference,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An inference or distribution precondition was not met
    /// (non-positive known quantity, missing tare/unit weight, …).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The distributed amounts diverge from the requested total beyond
    /// tolerance. Never rounded into success.
    #[error("distribution did not reconcile: requested {requested}, distributed {distributed}")]
    DistributionMismatch { requested: f64, distributed: f64 },

    /// A referenced entity is not in the graph.
    #[error("not found: {0}")]
    NotFound(String),

    /// A derivation generator failed. Propagated uncached, never retried.
    #[error("derivation failed: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
