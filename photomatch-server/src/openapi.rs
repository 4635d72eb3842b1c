//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 document served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::handlers::{
    CandidateView, CommitRequest, CommitResponse, HealthResponse, ItemView, MatchTaskResponse,
    ReadyResponse, SkipRequest, VersionResponse,
};

/// photomatch review API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "photomatch - Review API",
        version = "0.1.0",
        description = r#"
## Perceptual-hash duplicate reconciliation

Each unresolved item of the primary collection is compared against the
reference collection by Hamming distance between perceptual fingerprints.

1. **Fetch** the next task via `GET /api/match` (or `/api/match/{offset}`)
2. Review the ranked candidates; `auto_select_id` is set when metadata and
   capture time single out one candidate
3. **Commit** the decision via `POST /api/match/commit`, or
   **skip** the item via `POST /api/match/skip`

A `409 CONFLICTING_TRANSITION` means another reviewer decided the item first.
"#
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    tags(
        (name = "Matching", description = "Review tasks and match decisions"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::health::version,
        crate::handlers::matching::next_match,
        crate::handlers::matching::next_match_at,
        crate::handlers::matching::commit_match,
        crate::handlers::matching::skip_item,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            VersionResponse,
            MatchTaskResponse,
            ItemView,
            CandidateView,
            CommitRequest,
            CommitResponse,
            SkipRequest,
        )
    )
)]
pub struct ApiDoc;
