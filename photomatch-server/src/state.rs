//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use photomatch_core::{MatchEngine, MatchStore};

use crate::cache::TtlCandidateCache;
use crate::config::Config;

/// Engine over whichever store backend was configured
pub type SharedEngine = MatchEngine<dyn MatchStore>;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Matching engine (holds the store handle)
    pub engine: SharedEngine,
    /// Candidate cache, `None` when `CACHE_TIMEOUT=0`
    pub cache: Option<Arc<TtlCandidateCache>>,
}

impl AppState {
    /// Wire the engine and candidate cache for a store
    pub fn new(store: Arc<dyn MatchStore>, config: &Config) -> Self {
        let engine = MatchEngine::new(store, config.engine_config());
        let cache = config.cache_ttl().map(|ttl| Arc::new(TtlCandidateCache::new(ttl)));

        let engine = match &cache {
            Some(cache) => engine.with_cache(cache.clone()),
            None => engine,
        };

        Self { engine, cache }
    }
}
