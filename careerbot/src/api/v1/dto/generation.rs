//! DTOs for job-targeted generation.

use serde::Deserialize;

/// Request body for `POST /v1/cover-letters:generate` and
/// `POST /v1/recommendations:generate`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobArtifactRequest {
    pub owner_id: String,
    pub job_id: String,
}
