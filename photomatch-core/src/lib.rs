//! photomatch core - perceptual-hash candidate matching
//!
//! Reconciles a primary collection of media items against reference
//! collections holding the same photos and videos from another source.
//! Items are compared by precomputed perceptual fingerprints, never by
//! exact identity.
//!
//! # Features
//!
//! - Hamming distance over fixed-width fingerprints with explicit "undefined"
//! - Media-kind dispatched candidate retrieval (image vs. video)
//! - Deterministic auto-selection from camera/location metadata
//! - Idempotent item state machine applied atomically by the store
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use photomatch_core::{EngineConfig, Fingerprint, InMemoryStore, Item, MatchEngine, MediaKind};
//!
//! # async fn example() -> photomatch_core::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let mut item = Item::new(1, MediaKind::Image);
//! item.content_hash = Some(Fingerprint::from_u64(0xF0F0_F0F0_F0F0_F0F0));
//! store.insert_item(item);
//!
//! let engine = MatchEngine::new(store, EngineConfig::default());
//! let task = engine.next_match_task(0).await?;
//! if let Some(id) = task.auto_select_id {
//!     engine.commit_match(1, Some(id), false).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod auto_select;
pub mod cache;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod retrieval;
pub mod state_machine;
pub mod store;

// Re-export main types for convenience
pub use auto_select::{auto_select, AutoSelectRules};
pub use cache::{CachedCandidates, CandidateCache};
pub use engine::{CommitOutcome, EngineConfig, MatchEngine};
pub use error::{MatchError, Result};
pub use fingerprint::{hamming_distance, within_threshold, DistanceThreshold, Fingerprint};
pub use model::{Candidate, Item, MatchState, MatchTask, MediaKind, ReferenceEntry};
pub use retrieval::{retrieve_candidates, retrieve_partner_candidates, PartnerLookup};
pub use state_machine::{plan_transition, Plan, RematchPolicy, Transition};
pub use store::{
    Collection, HashField, MatchStore, StoreError, StoreResult, TransitionOutcome,
};

#[cfg(feature = "memory-store")]
pub use store::InMemoryStore;
