//! In-memory candidate cache with expiry
//!
//! Retrieval results are kept per item for `CACHE_TIMEOUT` seconds, or until
//! the engine invalidates them after a committed transition.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use photomatch_core::{CachedCandidates, CandidateCache};

/// Cached retrieval result with expiration
struct CacheEntry {
    value: CachedCandidates,
    expires_at: Instant,
}

/// TTL cache keyed by item id
pub struct TtlCandidateCache {
    entries: DashMap<i64, CacheEntry>,
    ttl: Duration,
}

impl TtlCandidateCache {
    /// Create a cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Remove expired entries (called periodically)
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of entries, including expired ones not yet cleaned up
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CandidateCache for TtlCandidateCache {
    fn get(&self, item_id: i64) -> Option<CachedCandidates> {
        let entry = self.entries.get(&item_id)?;
        if entry.expires_at > Instant::now() {
            return Some(entry.value.clone());
        }
        drop(entry);
        self.entries.remove(&item_id);
        None
    }

    fn put(&self, item_id: i64, value: CachedCandidates) {
        self.entries.insert(
            item_id,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    fn invalidate(&self, item_id: i64) {
        if self.entries.remove(&item_id).is_some() {
            tracing::debug!(item_id, "Candidate cache entry invalidated");
        }
    }
}

impl std::fmt::Debug for TtlCandidateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCandidateCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photomatch_core::{Candidate, MediaKind, ReferenceEntry};

    fn entry(id: i64) -> CachedCandidates {
        CachedCandidates {
            candidates: vec![Candidate {
                reference: ReferenceEntry::new(id, MediaKind::Image),
                thumb_distance: None,
                hamming_distance: Some(1),
            }],
            partner_candidates: Vec::new(),
            precomputed_candidate_ids: None,
        }
    }

    #[test]
    fn test_put_get_invalidate() {
        let cache = TtlCandidateCache::new(Duration::from_secs(60));
        cache.put(1, entry(10));
        assert_eq!(cache.get(1), Some(entry(10)));

        cache.invalidate(1);
        cache.invalidate(1);
        cache.invalidate(42);
        assert!(cache.get(1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = TtlCandidateCache::new(Duration::ZERO);
        cache.put(1, entry(10));
        assert!(cache.get(1).is_none());

        cache.put(2, entry(11));
        cache.cleanup_expired();
        assert_eq!(cache.len(), 0);
    }
}
