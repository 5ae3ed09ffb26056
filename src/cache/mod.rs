//! Content-addressed derivation cache.
//!
//! Raw scan entities are cheap to hold but expensive to interpret.
//! This module decides when a previously computed derived entity may be
//! reused: the [`DependencyTracker`] fingerprints every independent
//! input a derivation depends on, and the [`EntityCacheManager`]
//! memoizes generator results keyed by (source id, derivation kind)
//! with per-kind TTLs.

pub mod clock;
pub mod dependencies;
pub mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dependencies::{
    content_fingerprint, minimal_fingerprint, AlgorithmVersions, CatalogProvider,
    ChangeReport, ConfigProvider, DependencyField, DependencySet, DependencyTracker,
    DerivationKind,
};
pub use manager::{CacheKey, CacheStats, EntityCacheManager, FingerprintedCacheEntry};
