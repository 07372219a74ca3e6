//! In-memory cache of metadata lookups for one batch run.
//!
//! Keyed by ([`SourceKind`], [`Lookup`]). Misses and failed lookups are
//! stored as [`EnrichedRecord::Empty`], so each key reaches the network at
//! most once per run. Nothing is persisted; the cache lives as long as the
//! [`Resolver`](crate::resolver::Resolver) that owns it.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::record::EnrichedRecord;
use crate::source::{Lookup, SourceKind};

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct CacheKey {
    source: SourceKind,
    lookup: Lookup,
}

/// Thread-safe cache of lookup results.
#[derive(Default)]
pub struct QueryCache {
    entries: DashMap<CacheKey, EnrichedRecord>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached record. `Some(EnrichedRecord::Empty)` is a cached
    /// negative result, distinct from a miss (`None`).
    pub fn get(&self, source: SourceKind, lookup: &Lookup) -> Option<EnrichedRecord> {
        let key = CacheKey {
            source,
            lookup: lookup.clone(),
        };
        match self.entries.get(&key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(source = source.name(), %lookup, "cache hit");
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(source = source.name(), %lookup, "cache miss");
                None
            }
        }
    }

    /// Record the result of a lookup. The first insert for a key wins.
    pub fn insert(&self, source: SourceKind, lookup: &Lookup, record: EnrichedRecord) {
        tracing::trace!(
            source = source.name(),
            %lookup,
            found = !record.is_empty(),
            "cache insert"
        );
        self.entries
            .entry(CacheKey {
                source,
                lookup: lookup.clone(),
            })
            .or_insert(record);
    }

    /// Number of cache hits since creation.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of cache misses since creation.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
