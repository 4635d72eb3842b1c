//! Match engine: one retrieval/decision cycle per call.
//!
//! The engine is stateless between calls. It reads through a [`MatchStore`]
//! to build a [`MatchTask`] and forwards reviewer decisions to the store as
//! [`Transition`]s.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::auto_select::AutoSelectRules;
use crate::cache::{CachedCandidates, CandidateCache};
use crate::error::{MatchError, Result};
use crate::fingerprint::DistanceThreshold;
use crate::model::{Item, MatchTask};
use crate::retrieval::{retrieve_candidates, retrieve_partner_candidates};
use crate::state_machine::{RematchPolicy, Transition};
use crate::store::{MatchStore, StoreError};

/// Tunables for a [`MatchEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineConfig {
    pub threshold: DistanceThreshold,
    pub rematch_policy: RematchPolicy,
    pub auto_select: AutoSelectRules,
}

/// Result of a committed decision.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    pub item_id: i64,
    /// `false` when the item was already in the requested state.
    pub changed: bool,
    /// The item as stored after the call.
    pub item: Item,
}

/// Candidate matching engine over a shared store handle.
pub struct MatchEngine<S: MatchStore + ?Sized> {
    store: Arc<S>,
    config: EngineConfig,
    cache: Option<Arc<dyn CandidateCache>>,
}

impl<S: MatchStore + ?Sized> Clone for MatchEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
            cache: self.cache.clone(),
        }
    }
}

impl<S: MatchStore + ?Sized> MatchEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            cache: None,
        }
    }

    /// Reuse retrieval results per item until a transition is committed.
    pub fn with_cache(mut self, cache: Arc<dyn CandidateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the review task for the unresolved item at `offset`.
    ///
    /// Read-only. Primary retrieval errors abort the task; partner lookup
    /// failures degrade to an empty partner list.
    #[instrument(level = "info", skip(self), fields(threshold = self.config.threshold.get()))]
    pub async fn next_match_task(&self, offset: u64) -> Result<MatchTask> {
        let start = Instant::now();

        let count = self.store.count_unresolved().await?;
        let Some(item) = self.store.next_unresolved_item(offset).await? else {
            debug!(count, "No unresolved item at offset");
            return Ok(MatchTask::empty(count, offset));
        };

        // A retrieval racing a rematch can store its entry after the
        // invalidation, so hits are checked against the item just read
        let cached = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get(item.id))
            .filter(|hit| hit.matches(&item));

        let CachedCandidates {
            candidates,
            partner_candidates,
            ..
        } = match cached {
            Some(hit) => {
                debug!(item_id = item.id, "Candidate cache hit");
                hit
            }
            None => self.retrieve(&item).await?,
        };

        let auto_select_id = self.config.auto_select.select(&item, &candidates);

        info!(
            item_id = item.id,
            media_kind = %item.media_kind,
            candidates = candidates.len(),
            partner_candidates = partner_candidates.len(),
            auto_select_id = ?auto_select_id,
            latency_ms = start.elapsed().as_millis() as u64,
            "Match task ready"
        );

        Ok(MatchTask {
            count,
            offset,
            item: Some(item),
            candidates,
            partner_candidates,
            auto_select_id,
        })
    }

    async fn retrieve(&self, item: &Item) -> Result<CachedCandidates> {
        let candidates = retrieve_candidates(&*self.store, item, self.config.threshold).await?;
        let partner = retrieve_partner_candidates(&*self.store, item, self.config.threshold).await;

        let degraded = partner.is_unavailable();
        if degraded {
            warn!(item_id = item.id, "Continuing without partner candidates");
        }
        let retrieved = CachedCandidates {
            candidates,
            partner_candidates: partner.into_candidates(),
            precomputed_candidate_ids: item.precomputed_candidate_ids.clone(),
        };

        // A degraded partner lookup is not worth keeping around
        if let (Some(cache), false) = (&self.cache, degraded) {
            cache.put(item.id, retrieved.clone());
        }
        Ok(retrieved)
    }

    /// Confirm a match (or "no match" with `None`), or with `rematch` drop the
    /// precomputed candidate set. `reference_id` is ignored for rematches.
    pub async fn commit_match(
        &self,
        item_id: i64,
        reference_id: Option<i64>,
        rematch: bool,
    ) -> Result<CommitOutcome> {
        let transition = if rematch {
            self.config.rematch_policy.transition()
        } else {
            Transition::ConfirmMatch { reference_id }
        };
        self.apply(item_id, transition).await
    }

    /// Exclude the item from future tasks.
    pub async fn skip_item(&self, item_id: i64) -> Result<CommitOutcome> {
        self.apply(item_id, Transition::Skip).await
    }

    #[instrument(level = "info", skip(self))]
    async fn apply(&self, item_id: i64, transition: Transition) -> Result<CommitOutcome> {
        let result = self.store.apply_transition(item_id, transition).await;
        if let (Some(cache), Ok(_) | Err(StoreError::Conflict { .. })) = (&self.cache, &result) {
            cache.invalidate(item_id);
        }

        let outcome = result.map_err(MatchError::from)?;
        let changed = outcome.changed();
        if changed {
            info!(state = %outcome.item().match_state, "Transition committed");
        } else {
            debug!("Transition already applied");
        }

        Ok(CommitOutcome {
            item_id,
            changed,
            item: outcome.into_item(),
        })
    }
}
