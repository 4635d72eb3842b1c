//! Store backend selection
//!
//! - **PostgreSQL** when `DATABASE_URL` is set (production).
//! - **In-memory** otherwise: an empty store, useful for development and
//!   tests, lost on restart.

mod postgres;

pub use postgres::PostgresMatchStore;

use std::sync::Arc;

use photomatch_core::{InMemoryStore, MatchStore, StoreResult};

use crate::config::Config;

/// Build the configured store backend
pub async fn connect(config: &Config) -> StoreResult<Arc<dyn MatchStore>> {
    match config.database_url.as_deref() {
        Some(url) => {
            tracing::info!("Using PostgreSQL match store");
            let store = PostgresMatchStore::new(
                url,
                config.database_max_connections,
                config.database_min_connections,
            )
            .await?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using empty in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
