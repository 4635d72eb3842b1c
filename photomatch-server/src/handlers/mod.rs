//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod matching;

pub use crate::state::AppState;
pub use health::{health, ready, version, HealthResponse, ReadyResponse, VersionResponse};
pub use matching::{
    commit_match, next_match, next_match_at, skip_item, CandidateView, CommitRequest,
    CommitResponse, ItemView, MatchTaskResponse, SkipRequest,
};
