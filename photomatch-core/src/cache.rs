//! Candidate cache seam.
//!
//! Retrieval results can be reused across review cycles for the same item
//! until a transition on that item is committed. The engine consults a
//! [`CandidateCache`] when one is attached and invalidates the entry after
//! every commit attempt that reached the store.

use crate::model::{Candidate, Item};

/// Primary and partner candidates retrieved for one item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CachedCandidates {
    pub candidates: Vec<Candidate>,
    pub partner_candidates: Vec<Candidate>,
    /// The item's precomputed set at retrieval time. An entry whose set no
    /// longer matches the stored item is stale and must not be served.
    pub precomputed_candidate_ids: Option<Vec<i64>>,
}

impl CachedCandidates {
    /// Whether this entry was retrieved for the item as it is stored now.
    pub fn matches(&self, item: &Item) -> bool {
        self.precomputed_candidate_ids == item.precomputed_candidate_ids
    }
}

/// Cache of retrieval results keyed by item id.
///
/// `invalidate` must be safe to call repeatedly and for unknown ids.
pub trait CandidateCache: Send + Sync {
    fn get(&self, item_id: i64) -> Option<CachedCandidates>;
    fn put(&self, item_id: i64, entry: CachedCandidates);
    fn invalidate(&self, item_id: i64);
}
