//! Process-local store backed by concurrent maps.
//!
//! Each item lives in its own `DashMap` shard entry; holding the entry guard
//! while planning and writing a transition gives per-item atomicity.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Collection, HashField, MatchStore, StoreError, StoreResult, TransitionOutcome};
use crate::error::MatchError;
use crate::fingerprint::Fingerprint;
use crate::model::{Item, MatchState, ReferenceEntry};
use crate::state_machine::{plan_transition, Plan, Transition};

/// In-memory [`MatchStore`].
pub struct InMemoryStore {
    items: DashMap<i64, Item>,
    references: DashMap<i64, ReferenceEntry>,
    /// `None` models a deployment without a partner collection.
    partner: Option<DashMap<i64, ReferenceEntry>>,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Empty store with an (empty) partner collection.
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            references: DashMap::new(),
            partner: Some(DashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Empty store whose partner collection does not exist.
    pub fn without_partner() -> Self {
        Self {
            partner: None,
            ..Self::new()
        }
    }

    pub fn insert_item(&self, item: Item) {
        self.items.insert(item.id, item);
    }

    pub fn insert_reference(&self, entry: ReferenceEntry) {
        self.references.insert(entry.id, entry);
    }

    /// Insert into the partner collection; ignored when it does not exist.
    pub fn insert_partner(&self, entry: ReferenceEntry) {
        if let Some(partner) = &self.partner {
            partner.insert(entry.id, entry);
        }
    }

    pub fn item(&self, id: i64) -> Option<Item> {
        self.items.get(&id).map(|entry| entry.value().clone())
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Simulate the store going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store offline".into()))
        }
    }

    fn collection(&self, collection: Collection) -> StoreResult<&DashMap<i64, ReferenceEntry>> {
        match collection {
            Collection::Primary => Ok(&self.references),
            Collection::Partner => self
                .partner
                .as_ref()
                .ok_or(StoreError::CollectionUnavailable(Collection::Partner)),
        }
    }

    fn unresolved_sorted(&self) -> Vec<Item> {
        let mut unresolved: Vec<Item> = self
            .items
            .iter()
            .filter(|entry| entry.match_state == MatchState::Unresolved)
            .map(|entry| entry.value().clone())
            .collect();

        // capture_time DESC (unknown first), id ASC
        unresolved.sort_by_key(|item| (item.capture_time.is_some(), Reverse(item.capture_time), item.id));
        unresolved
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn count_unresolved(&self) -> StoreResult<u64> {
        self.ensure_available()?;
        Ok(self
            .items
            .iter()
            .filter(|entry| entry.match_state == MatchState::Unresolved)
            .count() as u64)
    }

    async fn next_unresolved_item(&self, skip: u64) -> StoreResult<Option<Item>> {
        self.ensure_available()?;
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        Ok(self.unresolved_sorted().into_iter().nth(skip))
    }

    async fn find_references_by_hash_distance(
        &self,
        collection: Collection,
        field: HashField,
        probe: &Fingerprint,
        max_distance: u32,
    ) -> StoreResult<Vec<ReferenceEntry>> {
        self.ensure_available()?;
        let entries = self.collection(collection)?;

        Ok(entries
            .iter()
            .filter(|entry| {
                field
                    .of(entry.value())
                    .and_then(|fp| fp.distance(probe).ok())
                    .is_some_and(|d| d <= max_distance)
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_references_by_ids(
        &self,
        collection: Collection,
        ids: &[i64],
    ) -> StoreResult<Vec<ReferenceEntry>> {
        self.ensure_available()?;
        let entries = self.collection(collection)?;

        let mut seen = std::collections::HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| entries.get(id).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn apply_transition(
        &self,
        item_id: i64,
        transition: Transition,
    ) -> StoreResult<TransitionOutcome> {
        self.ensure_available()?;
        let mut entry = self
            .items
            .get_mut(&item_id)
            .ok_or(StoreError::NotFound(item_id))?;

        match plan_transition(entry.value(), &transition) {
            Ok(Plan::Apply(next)) => {
                *entry.value_mut() = next.clone();
                tracing::debug!(item_id, ?transition, state = %next.match_state, "Transition applied");
                Ok(TransitionOutcome::Applied(next))
            }
            Ok(Plan::NoOp) => Ok(TransitionOutcome::Unchanged(entry.value().clone())),
            Err(MatchError::ConflictingTransition { item_id, current }) => {
                Err(StoreError::Conflict { item_id, current })
            }
            Err(other) => Err(StoreError::Corrupt(other.to_string())),
        }
    }

    async fn check_health(&self) -> StoreResult<()> {
        self.ensure_available()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("items", &self.items.len())
            .field("references", &self.references.len())
            .field("partner", &self.partner.as_ref().map(|p| p.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaKind;
    use chrono::{TimeZone, Utc};

    fn item_at(id: i64, day: Option<u32>) -> Item {
        let mut item = Item::new(id, MediaKind::Image);
        item.capture_time = day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap());
        item
    }

    #[tokio::test]
    async fn test_unresolved_order_undated_then_newest_then_id() {
        let store = InMemoryStore::new();
        store.insert_item(item_at(3, Some(1)));
        store.insert_item(item_at(2, Some(5)));
        store.insert_item(item_at(1, Some(5)));
        store.insert_item(item_at(4, None));

        let order: Vec<i64> = {
            let mut ids = Vec::new();
            for skip in 0..4 {
                ids.push(store.next_unresolved_item(skip).await.unwrap().unwrap().id);
            }
            ids
        };
        assert_eq!(order, vec![4, 1, 2, 3]);
        assert!(store.next_unresolved_item(4).await.unwrap().is_none());
        assert_eq!(store.count_unresolved().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_transitions_exclude_items_from_queue() {
        let store = InMemoryStore::new();
        store.insert_item(item_at(1, Some(1)));
        store.insert_item(item_at(2, Some(2)));

        store.apply_transition(2, Transition::Skip).await.unwrap();
        assert_eq!(store.count_unresolved().await.unwrap(), 1);
        assert_eq!(store.item_count(), 2);
        assert_eq!(store.next_unresolved_item(0).await.unwrap().unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_missing_item_is_not_found() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.apply_transition(99, Transition::Skip).await,
            Err(StoreError::NotFound(99))
        );
    }

    #[tokio::test]
    async fn test_conflicting_transition_is_reported() {
        let store = InMemoryStore::new();
        store.insert_item(item_at(1, Some(1)));
        store
            .apply_transition(1, Transition::ConfirmMatch { reference_id: Some(10) })
            .await
            .unwrap();

        let err = store
            .apply_transition(1, Transition::Skip)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                item_id: 1,
                current: MatchState::Matched
            }
        );
        assert_eq!(store.item(1).unwrap().matched_reference_id, Some(10));
    }

    #[tokio::test]
    async fn test_partner_collection_absent() {
        let store = InMemoryStore::without_partner();
        let probe = Fingerprint::from_u64(0);
        let err = store
            .find_references_by_hash_distance(Collection::Partner, HashField::ContentHash, &probe, 10)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::CollectionUnavailable(Collection::Partner));
    }

    #[tokio::test]
    async fn test_find_by_ids_ignores_unknown_and_duplicates() {
        let store = InMemoryStore::new();
        store.insert_reference(ReferenceEntry::new(1, MediaKind::Image));
        store.insert_reference(ReferenceEntry::new(2, MediaKind::Image));

        let found = store
            .find_references_by_ids(Collection::Primary, &[2, 2, 77])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }

    #[tokio::test]
    async fn test_offline_store_reports_unavailable() {
        let store = InMemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.count_unresolved().await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.check_health().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_confirms_apply_once() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        store.insert_item(item_at(1, Some(1)));

        let mut handles = Vec::new();
        for reference in 0..8i64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .apply_transition(1, Transition::ConfirmMatch { reference_id: Some(reference) })
                    .await
            }));
        }

        let mut applied = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(outcome) if outcome.changed() => applied += 1,
                Ok(_) => {}
                Err(StoreError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(conflicts, 7);
    }
}
