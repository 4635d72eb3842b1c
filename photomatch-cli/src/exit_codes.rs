//! Exit codes following sysexits.h conventions.
//!
//! Scripts driving `photomatch auto` can tell a conflict (someone else
//! decided first, retry later) from an outage or a bad request.

use reqwest::StatusCode;

use crate::client::ClientError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Request rejected as malformed.
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Item cannot be matched as stored (unsupported media kind, undefined distance).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Item does not exist.
/// Maps to EX_NOINPUT from sysexits.h.
pub const NOT_FOUND: i32 = 66;

/// Server or its store is unreachable.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// Server failed internally.
/// Maps to EX_SOFTWARE from sysexits.h.
pub const REMOTE_ERROR: i32 = 70;

/// Item was already transitioned differently.
/// Maps to EX_TEMPFAIL from sysexits.h.
pub const CONFLICT: i32 = 75;

/// Response did not match the API.
/// Maps to EX_PROTOCOL from sysexits.h.
pub const PROTOCOL_ERROR: i32 = 76;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ClientError>())
            .map_or(GENERAL_ERROR, code_for);

        Self {
            code,
            message: Some(format!("{err:#}")),
        }
    }
}

fn code_for(err: &ClientError) -> i32 {
    match err {
        ClientError::Unreachable(_) => UNAVAILABLE,
        ClientError::Decode(_) => PROTOCOL_ERROR,
        ClientError::Api { status, .. } => match *status {
            StatusCode::BAD_REQUEST if is_data_error(err) => DATA_ERROR,
            StatusCode::BAD_REQUEST => USAGE_ERROR,
            StatusCode::NOT_FOUND => NOT_FOUND,
            StatusCode::CONFLICT => CONFLICT,
            StatusCode::UNPROCESSABLE_ENTITY => DATA_ERROR,
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS => UNAVAILABLE,
            s if s.is_server_error() => REMOTE_ERROR,
            _ => GENERAL_ERROR,
        },
    }
}

fn is_data_error(err: &ClientError) -> bool {
    matches!(
        err,
        ClientError::Api { code, .. } if code == "UNSUPPORTED_MEDIA_KIND" || code == "INVALID_FINGERPRINT"
    )
}
