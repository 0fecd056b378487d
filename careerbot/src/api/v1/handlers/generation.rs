//! v1 handlers for job-targeted generation and knowledge repair.

use axum::extract::State;

use super::require_owner;
use crate::api::v1::dto::{JobArtifactRequest, OwnerRequest};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::{AppJson, AppState};
use crate::models::GeneratedArtifact;
use crate::services::RebuildReport;

/// `POST /api/v1/cover-letters:generate`
#[utoipa::path(
    post,
    path = "/api/v1/cover-letters:generate",
    tag = "generation",
    operation_id = "coverLetters.generate",
    request_body = JobArtifactRequest,
    responses(
        (status = 201, description = "Cover letter generated and stored", body = GeneratedArtifact),
        (status = 404, description = "Job not found", body = ApiError),
        (status = 503, description = "No language model configured", body = ApiError),
    )
)]
pub async fn generate_cover_letter(
    State(state): State<AppState>,
    AppJson(req): AppJson<JobArtifactRequest>,
) -> ApiResponse<GeneratedArtifact> {
    if let Err(resp) = require_owner(&req.owner_id) {
        return resp;
    }

    match state
        .career
        .generate_cover_letter(&req.owner_id, &req.job_id)
        .await
    {
        Ok(artifact) => ApiResponse::created(artifact),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/recommendations:generate`
///
/// Suggestions for tailoring the owner's résumé to a job posting.
#[utoipa::path(
    post,
    path = "/api/v1/recommendations:generate",
    tag = "generation",
    operation_id = "recommendations.generate",
    request_body = JobArtifactRequest,
    responses(
        (status = 201, description = "Recommendations generated and stored", body = GeneratedArtifact),
        (status = 404, description = "Job not found", body = ApiError),
        (status = 503, description = "No language model configured", body = ApiError),
    )
)]
pub async fn generate_recommendations(
    State(state): State<AppState>,
    AppJson(req): AppJson<JobArtifactRequest>,
) -> ApiResponse<GeneratedArtifact> {
    if let Err(resp) = require_owner(&req.owner_id) {
        return resp;
    }

    match state
        .career
        .generate_recommendations(&req.owner_id, &req.job_id)
        .await
    {
        Ok(artifact) => ApiResponse::created(artifact),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/knowledge:rebuild`
///
/// Re-derives one owner's knowledge records from the stored text.
#[utoipa::path(
    post,
    path = "/api/v1/knowledge:rebuild",
    tag = "knowledge",
    operation_id = "knowledge.rebuild",
    request_body = OwnerRequest,
    responses(
        (status = 200, description = "Knowledge rebuilt", body = RebuildReport),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn rebuild_knowledge(
    State(state): State<AppState>,
    AppJson(req): AppJson<OwnerRequest>,
) -> ApiResponse<RebuildReport> {
    if let Err(resp) = require_owner(&req.owner_id) {
        return resp;
    }

    match state.rebuilder.rebuild_owner(&req.owner_id).await {
        Ok(report) => ApiResponse::success(report),
        Err(e) => e.into(),
    }
}
