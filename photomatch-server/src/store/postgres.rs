//! PostgreSQL implementation of the match store.
//!
//! Fingerprints are stored as 64-bit `BIGINT`s and compared in SQL with
//! `bit_count((a # b)::bit(64))` (PostgreSQL 14+). Transitions run in a
//! transaction holding a row lock on the item.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use photomatch_core::{
    plan_transition, Collection, Fingerprint, HashField, Item, MatchError, MatchState, MatchStore,
    MediaKind, Plan, ReferenceEntry, StoreError, StoreResult, Transition, TransitionOutcome,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

/// SQLSTATE for `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

const ITEM_COLUMNS: &str = "id, filename, media_kind, content_hash, thumbnail_hash, capture_time, \
     match_state, matched_reference_id, precomputed_candidate_ids";

/// Review queue order; undated items first, as `DESC` sorts NULLs by default.
const QUEUE_ORDER: &str = "capture_time DESC NULLS FIRST, id ASC";

const REFERENCE_COLUMNS: &str = "id, filename, media_kind, content_hash, thumbnail_hash, \
     capture_time, camera_name, location, source_url, preview_url";

/// PostgreSQL-backed [`MatchStore`].
#[derive(Clone)]
pub struct PostgresMatchStore {
    pool: PgPool,
}

/// Row type for item queries.
#[derive(FromRow)]
struct ItemRow {
    id: i64,
    filename: Option<String>,
    media_kind: String,
    content_hash: Option<i64>,
    thumbnail_hash: Option<i64>,
    capture_time: Option<DateTime<Utc>>,
    match_state: String,
    matched_reference_id: Option<i64>,
    precomputed_candidate_ids: Option<Vec<i64>>,
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let match_state = MatchState::parse(&row.match_state).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "item {} has unknown match_state {:?}",
                row.id, row.match_state
            ))
        })?;

        Ok(Self {
            id: row.id,
            filename: row.filename,
            media_kind: MediaKind::from_label(&row.media_kind),
            content_hash: row.content_hash.map(Fingerprint::from_i64),
            thumbnail_hash: row.thumbnail_hash.map(Fingerprint::from_i64),
            capture_time: row.capture_time,
            match_state,
            matched_reference_id: row.matched_reference_id,
            precomputed_candidate_ids: row.precomputed_candidate_ids,
        })
    }
}

/// Row type for reference queries (primary and partner tables share a schema).
#[derive(FromRow)]
struct ReferenceRow {
    id: i64,
    filename: Option<String>,
    media_kind: String,
    content_hash: Option<i64>,
    thumbnail_hash: Option<i64>,
    capture_time: Option<DateTime<Utc>>,
    camera_name: Option<String>,
    location: Option<String>,
    source_url: Option<String>,
    preview_url: Option<String>,
}

impl From<ReferenceRow> for ReferenceEntry {
    fn from(row: ReferenceRow) -> Self {
        Self {
            id: row.id,
            filename: row.filename,
            media_kind: MediaKind::from_label(&row.media_kind),
            content_hash: row.content_hash.map(Fingerprint::from_i64),
            thumbnail_hash: row.thumbnail_hash.map(Fingerprint::from_i64),
            capture_time: row.capture_time,
            camera_name: row.camera_name,
            location: row.location,
            source_url: row.source_url,
            preview_url: row.preview_url,
        }
    }
}

fn table(collection: Collection) -> &'static str {
    match collection {
        Collection::Primary => "reference_entries",
        Collection::Partner => "partner_entries",
    }
}

fn column(field: HashField) -> &'static str {
    match field {
        HashField::ContentHash => "content_hash",
        HashField::ThumbnailHash => "thumbnail_hash",
    }
}

/// Map a query error, recognising a missing collection table.
fn lookup_error(collection: Collection, err: sqlx::Error) -> StoreError {
    let missing_table = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNDEFINED_TABLE);

    if missing_table {
        StoreError::CollectionUnavailable(collection)
    } else {
        query_error(err)
    }
}

fn query_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(err.to_string())
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}

impl PostgresMatchStore {
    /// Connect to the database and run migrations.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("connection failed: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;

        tracing::info!(max_connections, "Match store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Create a match store from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchStore for PostgresMatchStore {
    async fn count_unresolved(&self) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE match_state = 'unresolved'")
                .fetch_one(&self.pool)
                .await
                .map_err(query_error)?;

        Ok(count.max(0) as u64)
    }

    async fn next_unresolved_item(&self, skip: u64) -> StoreResult<Option<Item>> {
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM items
            WHERE match_state = 'unresolved'
            ORDER BY {QUEUE_ORDER}
            OFFSET $1
            LIMIT 1
            "#
        ))
        .bind(skip)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        row.map(Item::try_from).transpose()
    }

    async fn find_references_by_hash_distance(
        &self,
        collection: Collection,
        field: HashField,
        probe: &Fingerprint,
        max_distance: u32,
    ) -> StoreResult<Vec<ReferenceEntry>> {
        // Stored fingerprints are 64-bit; any other width is never comparable
        let Some(probe) = probe.as_i64() else {
            tracing::debug!(
                bits = probe.bit_width(),
                "Probe width does not match stored fingerprints"
            );
            return Ok(Vec::new());
        };

        let column = column(field);
        let rows: Vec<ReferenceRow> = sqlx::query_as(&format!(
            r#"
            SELECT {REFERENCE_COLUMNS}
            FROM {table}
            WHERE {column} IS NOT NULL
              AND bit_count(({column} # $1)::bit(64)) <= $2
            "#,
            table = table(collection),
        ))
        .bind(probe)
        .bind(i64::from(max_distance))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| lookup_error(collection, e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_references_by_ids(
        &self,
        collection: Collection,
        ids: &[i64],
    ) -> StoreResult<Vec<ReferenceEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<ReferenceRow> = sqlx::query_as(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM {table} WHERE id = ANY($1)",
            table = table(collection),
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| lookup_error(collection, e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn apply_transition(
        &self,
        item_id: i64,
        transition: Transition,
    ) -> StoreResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await.map_err(query_error)?;

        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 FOR UPDATE"
        ))
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(query_error)?;

        let current = Item::try_from(row.ok_or(StoreError::NotFound(item_id))?)?;

        let next = match plan_transition(&current, &transition) {
            Ok(Plan::Apply(next)) => next,
            // Dropping `tx` rolls back and releases the lock
            Ok(Plan::NoOp) => return Ok(TransitionOutcome::Unchanged(current)),
            Err(MatchError::ConflictingTransition { item_id, current }) => {
                return Err(StoreError::Conflict { item_id, current })
            }
            Err(other) => return Err(StoreError::Corrupt(other.to_string())),
        };

        sqlx::query(
            r#"
            UPDATE items
            SET match_state = $2,
                matched_reference_id = $3,
                precomputed_candidate_ids = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(next.match_state.as_str())
        .bind(next.matched_reference_id)
        .bind(&next.precomputed_candidate_ids)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;

        tracing::debug!(item_id, ?transition, state = %next.match_state, "Transition persisted");
        Ok(TransitionOutcome::Applied(next))
    }

    async fn check_health(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(())
    }
}
