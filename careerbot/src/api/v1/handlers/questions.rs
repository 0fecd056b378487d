//! v1 interview question handlers.

use axum::extract::{Path, State};
use axum_extra::extract::Query;

use super::require_owner;
use crate::api::v1::dto::{
    AnswerHelpRequest, DeletedResponse, GenerateQuestionsRequest, GenerateQuestionsResponse,
    OwnerQuery, SaveAnswerRequest,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::{AppJson, AppState};
use crate::models::{AnswerHelp, InterviewQuestion};

const HELP_SUFFIX: &str = ":help";

/// `POST /api/v1/questions:generate`
#[utoipa::path(
    post,
    path = "/api/v1/questions:generate",
    tag = "questions",
    operation_id = "questions.generate",
    request_body = GenerateQuestionsRequest,
    responses(
        (status = 201, description = "New questions stored", body = GenerateQuestionsResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Résumé or job not found", body = ApiError),
        (status = 503, description = "No language model configured", body = ApiError),
    )
)]
pub async fn generate_questions(
    State(state): State<AppState>,
    AppJson(req): AppJson<GenerateQuestionsRequest>,
) -> ApiResponse<GenerateQuestionsResponse> {
    if let Err(resp) = require_owner(&req.owner_id) {
        return resp;
    }

    match state
        .career
        .generate_questions(&req.owner_id, req.job_id.as_deref(), req.kind, req.count)
        .await
    {
        Ok(questions) => ApiResponse::created(GenerateQuestionsResponse { questions }),
        Err(e) => e.into(),
    }
}

/// `PUT /api/v1/questions/{questionId}/answer`
///
/// Saves the answer and re-indexes the question and answer pair.
#[utoipa::path(
    put,
    path = "/api/v1/questions/{questionId}/answer",
    tag = "questions",
    operation_id = "questions.saveAnswer",
    params(("questionId" = String, Path, description = "Question ID")),
    request_body = SaveAnswerRequest,
    responses(
        (status = 200, description = "Answer saved", body = InterviewQuestion),
        (status = 404, description = "Question not found", body = ApiError),
    )
)]
pub async fn save_answer(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
    AppJson(req): AppJson<SaveAnswerRequest>,
) -> ApiResponse<InterviewQuestion> {
    if let Err(resp) = require_owner(&req.owner_id) {
        return resp;
    }

    match state
        .ingestion
        .save_answer(&req.owner_id, &question_id, &req.answer)
        .await
    {
        Ok(question) => ApiResponse::success(question),
        Err(e) => e.into(),
    }
}

/// `DELETE /api/v1/questions/{questionId}?ownerId=`
#[utoipa::path(
    delete,
    path = "/api/v1/questions/{questionId}",
    tag = "questions",
    operation_id = "questions.delete",
    params(("questionId" = String, Path, description = "Question ID"), OwnerQuery),
    responses(
        (status = 200, description = "Question and its knowledge removed", body = DeletedResponse),
        (status = 404, description = "Question not found", body = ApiError),
    )
)]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResponse<DeletedResponse> {
    match state
        .ingestion
        .delete_question(&query.owner_id, &question_id)
        .await
    {
        Ok(()) => ApiResponse::success(DeletedResponse::new(question_id)),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/questions/{questionId}:help`
///
/// Drafts an answer, or refines the one supplied, and stores the model's
/// recommendation on the question.
#[utoipa::path(
    post,
    path = "/api/v1/questions/{questionId}:help",
    tag = "questions",
    operation_id = "questions.help",
    params(("questionId" = String, Path, description = "Question ID")),
    request_body = AnswerHelpRequest,
    responses(
        (status = 200, description = "Drafted or refined answer", body = AnswerHelp),
        (status = 404, description = "Question not found", body = ApiError),
        (status = 502, description = "Model output could not be parsed", body = ApiError),
        (status = 503, description = "No language model configured", body = ApiError),
    )
)]
pub async fn answer_help(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    AppJson(req): AppJson<AnswerHelpRequest>,
) -> ApiResponse<AnswerHelp> {
    // The router matches the whole `{questionId}:help` segment.
    let Some(question_id) = segment.strip_suffix(HELP_SUFFIX) else {
        return ApiResponse::error(ErrorCode::NotFound, format!("No route for {segment}"));
    };
    if let Err(resp) = require_owner(&req.owner_id) {
        return resp;
    }

    match state
        .career
        .answer_help(&req.owner_id, question_id, req.answer.as_deref())
        .await
    {
        Ok(help) => ApiResponse::success(help),
        Err(e) => e.into(),
    }
}
