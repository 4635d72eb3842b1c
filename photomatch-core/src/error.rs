use thiserror::Error;

use crate::model::MatchState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Unsupported media kind: {0:?}")]
    UnsupportedMediaKind(String),

    #[error("Undefined distance: {0}")]
    UndefinedDistance(String),

    #[error("Partner lookup unavailable: {0}")]
    PartnerLookupUnavailable(String),

    #[error("Conflicting transition on item {item_id}: item is {current}")]
    ConflictingTransition { item_id: i64, current: MatchState },

    #[error("Item {0} not found")]
    ItemNotFound(i64),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}

impl MatchError {
    /// Whether the caller may retry after refreshing its view of the item.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConflictingTransition { .. } | Self::StoreUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
