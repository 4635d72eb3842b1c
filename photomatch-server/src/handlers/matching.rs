//! Match review handlers
//!
//! - `GET /api/match[/{offset}]` builds the next review task
//! - `POST /api/match/commit` confirms a match, "no match", or requests a rematch
//! - `POST /api/match/skip` removes an item from the queue

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use photomatch_core::{Candidate, Item, MatchTask};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// An item awaiting review.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemView {
    #[schema(example = 4812)]
    pub id: i64,
    #[schema(example = "IMG-20240301-WA0007.jpg")]
    pub filename: Option<String>,
    /// `image`, `video`, or the stored label when unrecognized.
    #[schema(example = "image")]
    pub media_kind: String,
    pub capture_time: Option<DateTime<Utc>>,
    /// `unresolved`, `matched` or `skipped`.
    #[schema(example = "unresolved")]
    pub match_state: String,
    pub matched_reference_id: Option<i64>,
    /// Whether candidates come from a precomputed set rather than live retrieval.
    pub has_precomputed_candidates: bool,
    #[schema(example = "/api/item-thumbnail/4812")]
    pub thumbnail_url: String,
}

impl From<Item> for ItemView {
    fn from(item: Item) -> Self {
        Self {
            thumbnail_url: format!("/api/item-thumbnail/{}", item.id),
            id: item.id,
            filename: item.filename,
            media_kind: item.media_kind.to_string(),
            capture_time: item.capture_time,
            match_state: item.match_state.to_string(),
            matched_reference_id: item.matched_reference_id,
            has_precomputed_candidates: item.precomputed_candidate_ids.is_some(),
        }
    }
}

/// A reference entry proposed as a duplicate.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CandidateView {
    #[schema(example = 90211)]
    pub id: i64,
    pub filename: Option<String>,
    #[schema(example = "image")]
    pub media_kind: String,
    pub capture_time: Option<DateTime<Utc>>,
    #[schema(example = "Canon EOS R6")]
    pub camera_name: Option<String>,
    pub location: Option<String>,
    pub source_url: Option<String>,
    pub preview_url: Option<String>,
    /// Distance to the item's thumbnail fingerprint.
    #[schema(example = 3.0)]
    pub thumb_distance: Option<f64>,
    /// Distance between content fingerprints.
    #[schema(example = 4)]
    pub hamming_distance: Option<u32>,
    /// Served for primary-collection candidates only.
    #[schema(example = "/api/thumbnail/90211")]
    pub thumbnail_url: Option<String>,
}

impl CandidateView {
    fn primary(candidate: Candidate) -> Self {
        let url = format!("/api/thumbnail/{}", candidate.id());
        Self {
            thumbnail_url: Some(url),
            ..Self::partner(candidate)
        }
    }

    fn partner(candidate: Candidate) -> Self {
        let Candidate {
            reference,
            thumb_distance,
            hamming_distance,
        } = candidate;

        Self {
            id: reference.id,
            filename: reference.filename,
            media_kind: reference.media_kind.to_string(),
            capture_time: reference.capture_time,
            camera_name: reference.camera_name,
            location: reference.location,
            source_url: reference.source_url,
            preview_url: reference.preview_url,
            thumb_distance,
            hamming_distance,
            thumbnail_url: None,
        }
    }
}

/// Next review task.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MatchTaskResponse {
    /// Unresolved items remaining.
    #[schema(example = 131)]
    pub count: u64,
    #[schema(example = 0)]
    pub offset: u64,
    /// `null` when the queue is exhausted at this offset.
    pub item: Option<ItemView>,
    pub candidates: Vec<CandidateView>,
    /// Candidates from the partner collection; empty when it is unavailable.
    pub partner_candidates: Vec<CandidateView>,
    /// Candidate id the heuristic would confirm, if any.
    pub auto_select_id: Option<i64>,
}

impl From<MatchTask> for MatchTaskResponse {
    fn from(task: MatchTask) -> Self {
        Self {
            count: task.count,
            offset: task.offset,
            item: task.item.map(Into::into),
            candidates: task.candidates.into_iter().map(CandidateView::primary).collect(),
            partner_candidates: task
                .partner_candidates
                .into_iter()
                .map(CandidateView::partner)
                .collect(),
            auto_select_id: task.auto_select_id,
        }
    }
}

/// Commit a decision for an item.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommitRequest {
    #[schema(example = 4812)]
    pub item_id: Option<i64>,
    /// Matched reference id; `null` records "no match exists".
    #[serde(default)]
    #[schema(example = 90211)]
    pub reference_id: Option<i64>,
    /// Drop the precomputed candidate set instead of confirming.
    #[serde(default)]
    pub rematch: bool,
    /// Client's queue position, echoed back.
    #[serde(default)]
    pub offset: u64,
}

/// Skip an item.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SkipRequest {
    #[schema(example = 4812)]
    pub item_id: Option<i64>,
}

/// Result of a commit or skip.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommitResponse {
    pub ok: bool,
    /// `false` when the item was already in the requested state.
    pub changed: bool,
    pub item_id: i64,
    #[schema(example = "matched")]
    pub match_state: String,
    pub offset: u64,
}

fn require_item_id(item_id: Option<i64>) -> Result<i64, ApiError> {
    match item_id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(ApiError::bad_request("item_id required")),
    }
}

/// Get the review task at the head of the queue.
#[utoipa::path(
    get,
    path = "/api/match",
    tag = "Matching",
    responses(
        (status = 200, description = "Next review task", body = MatchTaskResponse),
        (status = 400, description = "Item has an unsupported media kind"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn next_match(State(state): State<AppState>) -> Result<Json<MatchTaskResponse>, ApiError> {
    next_match_at(State(state), Path(0)).await
}

/// Get the review task at `offset` in the queue.
#[utoipa::path(
    get,
    path = "/api/match/{offset}",
    tag = "Matching",
    params(("offset" = u64, Path, description = "Number of unresolved items to skip")),
    responses(
        (status = 200, description = "Review task", body = MatchTaskResponse),
        (status = 400, description = "Item has an unsupported media kind"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn next_match_at(
    State(state): State<AppState>,
    Path(offset): Path<u64>,
) -> Result<Json<MatchTaskResponse>, ApiError> {
    let task = state.engine.next_match_task(offset).await?;
    Ok(Json(task.into()))
}

/// Confirm a match, confirm "no match", or request a rematch.
#[utoipa::path(
    post,
    path = "/api/match/commit",
    tag = "Matching",
    request_body = CommitRequest,
    responses(
        (status = 200, description = "Decision recorded (or already recorded)", body = CommitResponse),
        (status = 400, description = "Missing item_id"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item was already transitioned differently"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn commit_match(
    State(state): State<AppState>,
    Json(request): Json<CommitRequest>,
) -> Result<Json<CommitResponse>, ApiError> {
    let item_id = require_item_id(request.item_id)?;

    let outcome = state
        .engine
        .commit_match(item_id, request.reference_id, request.rematch)
        .await?;

    Ok(Json(CommitResponse {
        ok: true,
        changed: outcome.changed,
        item_id,
        match_state: outcome.item.match_state.to_string(),
        offset: request.offset,
    }))
}

/// Skip an item without matching it.
#[utoipa::path(
    post,
    path = "/api/match/skip",
    tag = "Matching",
    request_body = SkipRequest,
    responses(
        (status = 200, description = "Item skipped (or already skipped)", body = CommitResponse),
        (status = 400, description = "Missing item_id"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item is already matched"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn skip_item(
    State(state): State<AppState>,
    Json(request): Json<SkipRequest>,
) -> Result<Json<CommitResponse>, ApiError> {
    let item_id = require_item_id(request.item_id)?;
    let outcome = state.engine.skip_item(item_id).await?;

    Ok(Json(CommitResponse {
        ok: true,
        changed: outcome.changed,
        item_id,
        match_state: outcome.item.match_state.to_string(),
        offset: 0,
    }))
}
