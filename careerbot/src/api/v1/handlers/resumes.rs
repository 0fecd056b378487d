//! v1 résumé handlers.

use axum::extract::{Multipart, Path, State};

use super::require_owner;
use crate::api::v1::dto::{ResumeResponse, ResumeUploadForm};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::models::ResumeIngestReport;

/// `POST /api/v1/resumes:upload`
///
/// Extracts the document's text, splits it into sections and replaces the
/// owner's previous résumé, both the canonical text and its knowledge.
#[utoipa::path(
    post,
    path = "/api/v1/resumes:upload",
    tag = "resumes",
    operation_id = "resumes.upload",
    request_body(content = ResumeUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Résumé ingested", body = ResumeIngestReport),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 415, description = "Not a PDF or DOCX document", body = ApiError),
        (status = 422, description = "Text could not be extracted", body = ApiError),
    )
)]
pub async fn upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResponse<ResumeIngestReport> {
    let mut owner_id: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_content_type: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return ApiResponse::error(
                    ErrorCode::InvalidRequest,
                    format!("Invalid multipart body: {}", e.body_text()),
                )
            }
        };
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_content_type = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                    Err(e) => {
                        return ApiResponse::error(
                            ErrorCode::InvalidRequest,
                            format!("Failed to read file: {}", e.body_text()),
                        );
                    }
                }
            }
            "ownerId" | "owner_id" => {
                owner_id = match field.text().await {
                    Ok(t) => Some(t.trim().to_string()),
                    Err(e) => {
                        return ApiResponse::error(
                            ErrorCode::InvalidRequest,
                            format!("Invalid ownerId: {}", e.body_text()),
                        );
                    }
                };
            }
            _ => {}
        }
    }

    let owner_id = owner_id.unwrap_or_default();
    if let Err(resp) = require_owner(&owner_id) {
        return resp;
    }
    let Some(bytes) = file_bytes.filter(|b| !b.is_empty()) else {
        return ApiResponse::error(ErrorCode::InvalidRequest, "A non-empty file is required");
    };

    match state
        .ingestion
        .ingest_resume(&owner_id, bytes, file_content_type.as_deref())
        .await
    {
        Ok(report) => ApiResponse::created(report),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/resumes/{ownerId}`
#[utoipa::path(
    get,
    path = "/api/v1/resumes/{ownerId}",
    tag = "resumes",
    operation_id = "resumes.get",
    params(("ownerId" = String, Path, description = "Owner ID")),
    responses(
        (status = 200, description = "Stored résumé", body = ResumeResponse),
        (status = 404, description = "No résumé uploaded", body = ApiError),
    )
)]
pub async fn get_resume(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> ApiResponse<ResumeResponse> {
    match state.db.get_resume(&owner_id).await {
        Ok(Some(resume)) => ApiResponse::success(ResumeResponse::from(resume)),
        Ok(None) => ApiResponse::error(
            ErrorCode::NotFound,
            format!("No résumé uploaded for {owner_id}"),
        ),
        Err(e) => e.into(),
    }
}
