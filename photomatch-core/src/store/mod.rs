//! Persistence contract consumed by the engine.
//!
//! The engine never owns durable state. Everything it reads or writes goes
//! through a [`MatchStore`], which is responsible for atomic per-item
//! transitions under concurrent callers.
//!
//! - [`memory::InMemoryStore`] (feature `memory-store`): process-local store
//!   used by tests and the development server.
//! - The PostgreSQL implementation lives in `photomatch-server`.

#[cfg(feature = "memory-store")]
pub mod memory;

#[cfg(feature = "memory-store")]
pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::MatchError;
use crate::fingerprint::Fingerprint;
use crate::model::{Item, MatchState, ReferenceEntry};
use crate::state_machine::Transition;

/// Which reference collection a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Primary,
    /// Secondary, disjoint reference set. May be absent.
    Partner,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary references"),
            Self::Partner => write!(f, "partner references"),
        }
    }
}

/// Fingerprint column of a reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashField {
    ContentHash,
    ThumbnailHash,
}

impl HashField {
    pub fn of<'a>(&self, entry: &'a ReferenceEntry) -> Option<&'a Fingerprint> {
        match self {
            Self::ContentHash => entry.content_hash.as_ref(),
            Self::ThumbnailHash => entry.thumbnail_hash.as_ref(),
        }
    }
}

/// Outcome of a successfully applied (or idempotently repeated) transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The item changed; carries the stored item.
    Applied(Item),
    /// The item was already in the requested state; carries the stored item.
    Unchanged(Item),
}

impl TransitionOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn item(&self) -> &Item {
        match self {
            Self::Applied(item) | Self::Unchanged(item) => item,
        }
    }

    pub fn into_item(self) -> Item {
        match self {
            Self::Applied(item) | Self::Unchanged(item) => item,
        }
    }
}

/// Errors reported by a store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Item {0} not found")]
    NotFound(i64),

    #[error("Item {item_id} was already transitioned (now {current})")]
    Conflict { item_id: i64, current: MatchState },

    #[error("Collection unavailable: {0}")]
    CollectionUnavailable(Collection),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for MatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => MatchError::ItemNotFound(id),
            StoreError::Conflict { item_id, current } => {
                MatchError::ConflictingTransition { item_id, current }
            }
            StoreError::CollectionUnavailable(Collection::Partner) => {
                MatchError::PartnerLookupUnavailable(err.to_string())
            }
            StoreError::CollectionUnavailable(Collection::Primary)
            | StoreError::Unavailable(_)
            | StoreError::Corrupt(_) => MatchError::StoreUnavailable(err.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Queryable store of items and reference collections.
///
/// Implementations must be thread-safe and must make `apply_transition`
/// atomic with respect to other callers on the same item.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Number of unresolved items.
    async fn count_unresolved(&self) -> StoreResult<u64>;

    /// The unresolved item at position `skip`, ordered by capture time
    /// (newest first, unknown last) then id ascending.
    async fn next_unresolved_item(&self, skip: u64) -> StoreResult<Option<Item>>;

    /// Reference entries whose `field` is within `max_distance` of `probe`.
    async fn find_references_by_hash_distance(
        &self,
        collection: Collection,
        field: HashField,
        probe: &Fingerprint,
        max_distance: u32,
    ) -> StoreResult<Vec<ReferenceEntry>>;

    /// Reference entries with exactly these ids. Unknown ids are ignored.
    async fn find_references_by_ids(
        &self,
        collection: Collection,
        ids: &[i64],
    ) -> StoreResult<Vec<ReferenceEntry>>;

    /// Apply `transition` to the item atomically.
    async fn apply_transition(
        &self,
        item_id: i64,
        transition: Transition,
    ) -> StoreResult<TransitionOutcome>;

    /// Cheap connectivity check.
    async fn check_health(&self) -> StoreResult<()>;
}
