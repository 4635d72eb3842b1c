//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use photomatch_core::MatchError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Matching engine error
    #[error("Match error: {0}")]
    Match(#[from] MatchError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Match(ref e) => match e {
                MatchError::UnsupportedMediaKind(_) | MatchError::InvalidFingerprint(_) => {
                    StatusCode::BAD_REQUEST
                }
                MatchError::ItemNotFound(_) => StatusCode::NOT_FOUND,
                MatchError::ConflictingTransition { .. } => StatusCode::CONFLICT,
                MatchError::UndefinedDistance(_) => StatusCode::UNPROCESSABLE_ENTITY,
                // Partner lookups degrade inside the engine; reaching here means a store outage
                MatchError::StoreUnavailable(_) | MatchError::PartnerLookupUnavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Match(ref e) => match e {
                MatchError::UnsupportedMediaKind(_) => "UNSUPPORTED_MEDIA_KIND",
                MatchError::InvalidFingerprint(_) => "INVALID_FINGERPRINT",
                MatchError::ItemNotFound(_) => "ITEM_NOT_FOUND",
                MatchError::ConflictingTransition { .. } => "CONFLICTING_TRANSITION",
                MatchError::UndefinedDistance(_) => "UNDEFINED_DISTANCE",
                MatchError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
                MatchError::PartnerLookupUnavailable(_) => "PARTNER_LOOKUP_UNAVAILABLE",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Store errors can carry connection details
            Self::Match(MatchError::StoreUnavailable(_)) => "Store unavailable".to_string(),
            Self::Match(MatchError::PartnerLookupUnavailable(_)) => {
                "Partner collection unavailable".to_string()
            }
            Self::Match(e) => e.to_string(),
            Self::BadRequest(_) => self.to_string(),
        }
    }

    /// Whether the client may retry the same request
    pub fn retryable(&self) -> bool {
        match self {
            Self::Match(e) => e.is_retryable(),
            Self::BadRequest(_) => false,
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Match(_) => "match",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();
        let retryable = self.retryable();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
            "retryable": retryable,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photomatch_core::MatchState;

    #[test]
    fn test_match_error_status_mapping() {
        let cases = [
            (
                MatchError::UnsupportedMediaKind("audio".into()),
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_MEDIA_KIND",
            ),
            (MatchError::ItemNotFound(1), StatusCode::NOT_FOUND, "ITEM_NOT_FOUND"),
            (
                MatchError::ConflictingTransition {
                    item_id: 1,
                    current: MatchState::Skipped,
                },
                StatusCode::CONFLICT,
                "CONFLICTING_TRANSITION",
            ),
            (
                MatchError::StoreUnavailable("db down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
            ),
            (
                MatchError::UndefinedDistance("missing hash".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNDEFINED_DISTANCE",
            ),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status);
            assert_eq!(api.error_code(), code);
        }
    }

    #[test]
    fn test_store_details_are_not_leaked() {
        let api = ApiError::from(MatchError::StoreUnavailable(
            "postgres://user:secret@db".into(),
        ));
        assert_eq!(api.client_message(), "Store unavailable");
        assert!(api.retryable());
    }

    #[test]
    fn test_bad_request_mapping() {
        let api = ApiError::bad_request("item_id required");
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(api.error_code(), "INVALID_INPUT");
        assert_eq!(api.client_message(), "Bad request: item_id required");
        assert!(!api.retryable());
    }
}
