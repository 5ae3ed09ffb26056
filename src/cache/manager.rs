//! Get-or-generate memoizer for derived entities.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::model::{Entity, EntityId};
use crate::Result;

use super::clock::{Clock, SystemClock};
use super::dependencies::{
    minimal_fingerprint, DependencySet, DependencyTracker, DerivationKind,
};

/// Cache key: one derivation kind per source entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source_id: EntityId,
    pub kind: DerivationKind,
}

/// A cached derived entity together with everything needed to decide
/// whether it may be reused. Replaced wholesale on regeneration, never
/// partially mutated.
#[derive(Debug, Clone)]
pub struct FingerprintedCacheEntry {
    pub derived: Entity,
    pub source_id: EntityId,
    pub kind: DerivationKind,
    pub content_fingerprint: String,
    pub dependencies: DependencySet,
    pub cached_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl FingerprintedCacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.cached_at >= self.ttl
    }
}

/// Counter snapshot. Counters are cumulative since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub content_changes: u64,
    pub expirations: u64,
    pub entries: usize,
}

enum MissReason {
    Cold,
    Expired,
    ContentChanged,
}

/// Memoizes expensive derivations keyed by (source id, derivation kind).
///
/// ## Concurrency
///
/// Safe for concurrent callers: the backing map is behind an `RwLock`
/// held only for lookups and inserts, and statistics counters are
/// atomic. The check-then-generate sequence is **not** transactionally
/// atomic — two concurrent misses for the same key may both invoke the
/// generator, and the later insert wins (last-write-wins). Generators
/// are assumed pure and idempotent, so both produce the same entity.
/// No lock is held while a generator runs.
///
/// Generator failures propagate to the caller; nothing is cached and
/// nothing is retried.
pub struct EntityCacheManager {
    entries: RwLock<HashMap<CacheKey, FingerprintedCacheEntry>>,
    ttls: HashMap<DerivationKind, Duration>,
    tracker: DependencyTracker,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    content_changes: AtomicU64,
    expirations: AtomicU64,
}

impl EntityCacheManager {
    /// Manager with the default per-kind TTLs and the system clock.
    ///
    /// Defaults reflect how often each derivation's inputs actually
    /// change: plain tag decodes are cheap and volatile (30 min),
    /// decryption keys rotate rarely (2 h), catalog interpretation is
    /// the heaviest and slowest-moving (24 h).
    pub fn new(tracker: DependencyTracker) -> Self {
        let mut ttls = HashMap::new();
        ttls.insert(DerivationKind::TagDecode, Duration::minutes(30));
        ttls.insert(DerivationKind::PayloadDecrypt, Duration::minutes(120));
        ttls.insert(DerivationKind::ProductInterpret, Duration::minutes(1440));
        Self {
            entries: RwLock::new(HashMap::new()),
            ttls,
            tracker,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            content_changes: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Override the TTL for one derivation kind.
    pub fn with_ttl(mut self, kind: DerivationKind, ttl: Duration) -> Self {
        self.ttls.insert(kind, ttl);
        self
    }

    /// Inject a clock (a [`super::ManualClock`] makes expiry testable).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    fn ttl_for(&self, kind: DerivationKind) -> Duration {
        self.ttls.get(&kind).copied().unwrap_or_else(|| Duration::minutes(30))
    }

    // ========================================================================
    // Core operation
    // ========================================================================

    /// Return the cached derivation of `source`, or run `generator` and
    /// cache its result.
    ///
    /// A cached entry is reused only when its TTL has not elapsed *and*
    /// a freshly recomputed minimal fingerprint of the source matches
    /// the stored one. On reuse the stored entity is returned unchanged.
    pub fn get_or_generate<F>(
        &self,
        source: &Entity,
        kind: DerivationKind,
        generator: F,
    ) -> Result<Entity>
    where
        F: FnOnce(&Entity) -> Result<Entity>,
    {
        let key = CacheKey { source_id: source.id().clone(), kind };
        let now = self.clock.now();
        let fingerprint = minimal_fingerprint(source, kind);

        let reason = {
            let entries = self.entries.read();
            match entries.get(&key) {
                None => MissReason::Cold,
                Some(entry) if entry.is_expired(now) => MissReason::Expired,
                Some(entry) if entry.content_fingerprint != fingerprint => {
                    MissReason::ContentChanged
                }
                Some(entry) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(source = %key.source_id, kind = %kind, "cache hit");
                    return Ok(entry.derived.clone());
                }
            }
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        match reason {
            MissReason::Cold => {
                debug!(source = %key.source_id, kind = %kind, "cache miss");
            }
            MissReason::Expired => {
                self.expirations.fetch_add(1, Ordering::Relaxed);
                debug!(source = %key.source_id, kind = %kind, "cache entry expired");
            }
            MissReason::ContentChanged => {
                self.content_changes.fetch_add(1, Ordering::Relaxed);
                debug!(source = %key.source_id, kind = %kind, "source content changed");
            }
        }

        // Generator runs with no lock held; it may be arbitrarily slow.
        let derived = generator(source)?;
        let dependencies = self.tracker.extract(kind, source);
        let entry = FingerprintedCacheEntry {
            derived: derived.clone(),
            source_id: key.source_id.clone(),
            kind,
            content_fingerprint: fingerprint,
            dependencies,
            cached_at: now,
            ttl: self.ttl_for(kind),
        };
        self.entries.write().insert(key, entry);
        Ok(derived)
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Drop every entry derived from the given source. Returns the
    /// number removed.
    pub fn invalidate_source(&self, source_id: &EntityId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.source_id != *source_id);
        let removed = before - entries.len();
        if removed > 0 {
            info!(source = %source_id, removed, "invalidated cached derivations");
        }
        removed
    }

    /// Drop every entry of the given derivation kind. Returns the
    /// number removed.
    pub fn invalidate_kind(&self, kind: DerivationKind) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.kind != kind);
        let removed = before - entries.len();
        if removed > 0 {
            info!(%kind, removed, "invalidated cached derivations");
        }
        removed
    }

    /// Sweep out entries past their TTL. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Clone of the entry for (source, kind), if cached. Validity is not
    /// re-checked here.
    pub fn peek(&self, source_id: &EntityId, kind: DerivationKind) -> Option<FingerprintedCacheEntry> {
        let key = CacheKey { source_id: source_id.clone(), kind };
        self.entries.read().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            content_changes: self.content_changes.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            entries: self.entries.read().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::model::{EntityType, keys};
    use std::sync::atomic::AtomicUsize;

    fn scan_source() -> Entity {
        Entity::with_id("tag-1".into(), EntityType::Identifier, "tag")
            .with_property(keys::RAW_PAYLOAD, vec![1u8, 2, 3])
            .with_property(keys::SCAN_FORMAT, "ntag215")
    }

    fn decode(source: &Entity) -> Result<Entity> {
        Ok(Entity::new(EntityType::Information, format!("decoded {}", source.label)))
    }

    #[test]
    fn test_second_call_is_a_hit() {
        let manager = EntityCacheManager::new(DependencyTracker::new());
        let source = scan_source();
        let calls = AtomicUsize::new(0);

        let first = manager
            .get_or_generate(&source, DerivationKind::TagDecode, |s| {
                calls.fetch_add(1, Ordering::SeqCst);
                decode(s)
            })
            .unwrap();
        let second = manager
            .get_or_generate(&source, DerivationKind::TagDecode, |s| {
                calls.fetch_add(1, Ordering::SeqCst);
                decode(s)
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.id(), second.id());
        let stats = manager.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_property_change_forces_regeneration() {
        let manager = EntityCacheManager::new(DependencyTracker::new());
        let mut source = scan_source();

        manager.get_or_generate(&source, DerivationKind::TagDecode, decode).unwrap();
        source.set_property("label_note", "rewound");
        manager.get_or_generate(&source, DerivationKind::TagDecode, decode).unwrap();

        let stats = manager.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.content_changes, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_ttl_expiry_with_manual_clock() {
        let clock = Arc::new(ManualClock::from_system());
        let manager = EntityCacheManager::new(DependencyTracker::new())
            .with_clock(clock.clone())
            .with_ttl(DerivationKind::TagDecode, Duration::minutes(10));
        let source = scan_source();

        manager.get_or_generate(&source, DerivationKind::TagDecode, decode).unwrap();
        clock.advance(Duration::minutes(11));
        manager.get_or_generate(&source, DerivationKind::TagDecode, decode).unwrap();

        let stats = manager.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_generator_failure_is_not_cached() {
        let manager = EntityCacheManager::new(DependencyTracker::new());
        let source = scan_source();

        let failed = manager.get_or_generate(&source, DerivationKind::TagDecode, |_| {
            Err(crate::Error::Generation("bad key".into()))
        });
        assert!(failed.is_err());
        assert!(manager.is_empty());

        // The next call generates normally.
        let ok = manager.get_or_generate(&source, DerivationKind::TagDecode, decode);
        assert!(ok.is_ok());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_invalidation_by_source_and_kind() {
        let manager = EntityCacheManager::new(DependencyTracker::new());
        let a = scan_source();
        let b = Entity::with_id("tag-2".into(), EntityType::Identifier, "other tag");

        manager.get_or_generate(&a, DerivationKind::TagDecode, decode).unwrap();
        manager.get_or_generate(&a, DerivationKind::ProductInterpret, decode).unwrap();
        manager.get_or_generate(&b, DerivationKind::TagDecode, decode).unwrap();
        assert_eq!(manager.len(), 3);

        assert_eq!(manager.invalidate_source(a.id()), 2);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.invalidate_kind(DerivationKind::TagDecode), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_cleanup_expired_sweeps_only_stale_entries() {
        let clock = Arc::new(ManualClock::from_system());
        let manager = EntityCacheManager::new(DependencyTracker::new())
            .with_clock(clock.clone())
            .with_ttl(DerivationKind::TagDecode, Duration::minutes(10))
            .with_ttl(DerivationKind::ProductInterpret, Duration::minutes(60));
        let source = scan_source();

        manager.get_or_generate(&source, DerivationKind::TagDecode, decode).unwrap();
        manager.get_or_generate(&source, DerivationKind::ProductInterpret, decode).unwrap();

        clock.advance(Duration::minutes(30));
        assert_eq!(manager.cleanup_expired(), 1);
        assert!(manager.peek(source.id(), DerivationKind::TagDecode).is_none());
        assert!(manager.peek(source.id(), DerivationKind::ProductInterpret).is_some());
    }
}
