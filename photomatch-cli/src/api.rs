//! Wire types of the review API, as seen by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemView {
    pub id: i64,
    pub filename: Option<String>,
    pub media_kind: String,
    pub capture_time: Option<DateTime<Utc>>,
    pub match_state: String,
    #[serde(default)]
    pub has_precomputed_candidates: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateView {
    pub id: i64,
    pub filename: Option<String>,
    pub capture_time: Option<DateTime<Utc>>,
    pub camera_name: Option<String>,
    pub location: Option<String>,
    pub thumb_distance: Option<f64>,
    pub hamming_distance: Option<u32>,
}

/// Payload of `GET /api/match/{offset}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchTask {
    pub count: u64,
    pub offset: u64,
    pub item: Option<ItemView>,
    #[serde(default)]
    pub candidates: Vec<CandidateView>,
    #[serde(default)]
    pub partner_candidates: Vec<CandidateView>,
    pub auto_select_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CommitRequest {
    pub item_id: i64,
    pub reference_id: Option<i64>,
    pub rematch: bool,
    pub offset: u64,
}

#[derive(Debug, Serialize)]
pub struct SkipRequest {
    pub item_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub ok: bool,
    pub changed: bool,
    pub item_id: i64,
    pub match_state: String,
    pub offset: u64,
}

/// JSON body of a non-2xx response.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}
