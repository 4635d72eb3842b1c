//! Candidate retrieval.
//!
//! Retrieval is type-dispatched on the item's media kind:
//!
//! | Item | Predicate |
//! |---|---|
//! | precomputed ids set | exactly those reference ids, no threshold |
//! | video | `thumbnail_hash ~ item.thumbnail_hash` **or** `content_hash ~ item.thumbnail_hash` |
//! | image | `content_hash ~ item.content_hash` |
//! | other | [`MatchError::UnsupportedMediaKind`] |
//!
//! The video branch compares the item's extracted frame against the content
//! hash of reference stills on purpose: a frame of a clip may be a photo in
//! the reference set.
//!
//! Results are ordered by capture time ascending (unknown last), then
//! reference id descending.

use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{MatchError, Result};
use crate::fingerprint::{hamming_distance, DistanceThreshold};
use crate::model::{Candidate, Item, MediaKind, ReferenceEntry};
use crate::store::{Collection, HashField, MatchStore, StoreError};

/// Outcome of the secondary (partner) lookup.
///
/// Partner lookups never fail the surrounding task; this type keeps
/// "nothing found" and "could not look" apart for logging and callers that care.
#[derive(Debug, Clone, PartialEq)]
pub enum PartnerLookup {
    Found(Vec<Candidate>),
    Empty,
    Unavailable(String),
}

impl PartnerLookup {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Degrade to a plain candidate list (`[]` unless found).
    pub fn into_candidates(self) -> Vec<Candidate> {
        match self {
            Self::Found(candidates) => candidates,
            Self::Empty | Self::Unavailable(_) => Vec::new(),
        }
    }
}

/// Retrieve and rank primary-collection candidates for `item`.
pub async fn retrieve_candidates<S: MatchStore + ?Sized>(
    store: &S,
    item: &Item,
    threshold: DistanceThreshold,
) -> Result<Vec<Candidate>> {
    if let Some(ids) = &item.precomputed_candidate_ids {
        debug!(item_id = item.id, ids = ids.len(), "Using precomputed candidate set");
        let entries = store
            .find_references_by_ids(Collection::Primary, ids)
            .await?;
        return Ok(rank(item, entries));
    }

    let entries = live_lookup(store, Collection::Primary, item, threshold).await?;
    Ok(rank(item, entries))
}

/// Same dispatch against the partner collection; never propagates failures.
pub async fn retrieve_partner_candidates<S: MatchStore + ?Sized>(
    store: &S,
    item: &Item,
    threshold: DistanceThreshold,
) -> PartnerLookup {
    match live_lookup(store, Collection::Partner, item, threshold).await {
        Ok(entries) if entries.is_empty() => PartnerLookup::Empty,
        Ok(entries) => PartnerLookup::Found(rank(item, entries)),
        Err(err) => {
            warn!(item_id = item.id, error = %err, "Partner lookup unavailable");
            PartnerLookup::Unavailable(err.to_string())
        }
    }
}

async fn live_lookup<S: MatchStore + ?Sized>(
    store: &S,
    collection: Collection,
    item: &Item,
    threshold: DistanceThreshold,
) -> Result<Vec<ReferenceEntry>> {
    let max = threshold.get();

    match &item.media_kind {
        MediaKind::Video => {
            let Some(probe) = item.thumbnail_hash.as_ref() else {
                debug!(item_id = item.id, "Video has no thumbnail fingerprint");
                return Ok(Vec::new());
            };
            let by_thumb = store
                .find_references_by_hash_distance(collection, HashField::ThumbnailHash, probe, max)
                .await
                .map_err(|e| lookup_error(collection, e))?;
            let by_content = store
                .find_references_by_hash_distance(collection, HashField::ContentHash, probe, max)
                .await
                .map_err(|e| lookup_error(collection, e))?;

            let mut seen = HashSet::with_capacity(by_thumb.len() + by_content.len());
            Ok(by_thumb
                .into_iter()
                .chain(by_content)
                .filter(|entry| seen.insert(entry.id))
                .collect())
        }
        MediaKind::Image => {
            let Some(probe) = item.content_hash.as_ref() else {
                debug!(item_id = item.id, "Image has no content fingerprint");
                return Ok(Vec::new());
            };
            store
                .find_references_by_hash_distance(collection, HashField::ContentHash, probe, max)
                .await
                .map_err(|e| lookup_error(collection, e))
        }
        MediaKind::Unknown(label) => Err(MatchError::UnsupportedMediaKind(label.clone())),
    }
}

fn lookup_error(collection: Collection, err: StoreError) -> MatchError {
    match (collection, err) {
        (Collection::Partner, err) => MatchError::PartnerLookupUnavailable(err.to_string()),
        (Collection::Primary, err) => err.into(),
    }
}

/// Annotate distances and apply the deterministic shortlist order.
fn rank(item: &Item, entries: Vec<ReferenceEntry>) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = entries
        .into_iter()
        .map(|reference| Candidate {
            thumb_distance: hamming_distance(
                reference.thumbnail_hash.as_ref(),
                item.thumbnail_hash.as_ref(),
            )
            .map(f64::from),
            hamming_distance: hamming_distance(
                item.content_hash.as_ref(),
                reference.content_hash.as_ref(),
            ),
            reference,
        })
        .collect();

    candidates.sort_by(shortlist_order);
    candidates
}

fn shortlist_order(a: &Candidate, b: &Candidate) -> Ordering {
    let key = |c: &Candidate| {
        (
            c.reference.capture_time.is_none(),
            c.reference.capture_time,
            Reverse(c.reference.id),
        )
    };
    key(a).cmp(&key(b))
}
