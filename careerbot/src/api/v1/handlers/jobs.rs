//! v1 job posting handlers.

use axum::extract::{Path, State};
use axum_extra::extract::Query;

use super::require_owner;
use crate::api::v1::dto::{CreateJobRequest, DeletedResponse, OwnerQuery};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::{AppJson, AppState};
use crate::models::JobDetails;

/// `POST /api/v1/jobs`
///
/// Stores a job posting, its sections and their knowledge records.
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "jobs",
    operation_id = "jobs.create",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job posting saved", body = JobDetails),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 502, description = "Model output could not be parsed", body = ApiError),
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateJobRequest>,
) -> ApiResponse<JobDetails> {
    let (owner_id, new_job) = req.into_parts();
    if let Err(resp) = require_owner(&owner_id) {
        return resp;
    }

    match state.ingestion.create_job(&owner_id, new_job).await {
        Ok(details) => ApiResponse::created(details),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/jobs/{jobId}?ownerId=`
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{jobId}",
    tag = "jobs",
    operation_id = "jobs.get",
    params(("jobId" = String, Path, description = "Job ID"), OwnerQuery),
    responses(
        (status = 200, description = "Job posting with its sections", body = JobDetails),
        (status = 404, description = "Job not found", body = ApiError),
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResponse<JobDetails> {
    let job = match state.db.get_job(&query.owner_id, &job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => return ApiResponse::error(ErrorCode::NotFound, format!("Job {job_id} not found")),
        Err(e) => return e.into(),
    };

    match state.db.get_job_sections(&job.id).await {
        Ok(sections) => ApiResponse::success(JobDetails { job, sections }),
        Err(e) => e.into(),
    }
}

/// `DELETE /api/v1/jobs/{jobId}?ownerId=`
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{jobId}",
    tag = "jobs",
    operation_id = "jobs.delete",
    params(("jobId" = String, Path, description = "Job ID"), OwnerQuery),
    responses(
        (status = 200, description = "Job posting and its knowledge removed", body = DeletedResponse),
        (status = 404, description = "Job not found", body = ApiError),
    )
)]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResponse<DeletedResponse> {
    match state.ingestion.delete_job(&query.owner_id, &job_id).await {
        Ok(()) => ApiResponse::success(DeletedResponse::new(job_id)),
        Err(e) => e.into(),
    }
}
