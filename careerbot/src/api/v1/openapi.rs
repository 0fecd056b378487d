use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;
use crate::models;
use crate::services::RebuildReport;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Careerbot API",
        version = "1.0.0",
        description = "Career assistant backend: résumé and job posting ingestion, interview preparation and job-targeted writing, grounded in each user's own documents.",
    ),
    paths(
        handlers::health::health_check,
        handlers::resumes::upload_resume,
        handlers::resumes::get_resume,
        handlers::jobs::create_job,
        handlers::jobs::get_job,
        handlers::jobs::delete_job,
        handlers::questions::generate_questions,
        handlers::questions::save_answer,
        handlers::questions::delete_question,
        handlers::questions::answer_help,
        handlers::chat::send_message,
        handlers::chat::list_messages,
        handlers::chat::expire_session,
        handlers::generation::generate_cover_letter,
        handlers::generation::generate_recommendations,
        handlers::generation::rebuild_knowledge,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        // Common
        dto::OwnerQuery,
        dto::OwnerRequest,
        dto::DeletedResponse,
        // Résumés
        dto::ResumeUploadForm,
        dto::ResumeResponse,
        models::Section,
        models::ResumeIngestReport,
        // Jobs
        dto::CreateJobRequest,
        models::JobDetails,
        models::JobPosting,
        models::JobSection,
        models::JobSectionKind,
        // Questions
        dto::GenerateQuestionsRequest,
        dto::GenerateQuestionsResponse,
        dto::SaveAnswerRequest,
        dto::AnswerHelpRequest,
        models::InterviewQuestion,
        models::QuestionKind,
        models::AnswerHelp,
        models::AnswerHelpStage,
        // Chat
        dto::ChatTurnRequest,
        dto::ChatMessagesResponse,
        dto::ExpireSessionResponse,
        models::ChatReply,
        models::ChatMessage,
        models::MessageRole,
        // Generation
        dto::JobArtifactRequest,
        models::GeneratedArtifact,
        models::ArtifactKind,
        RebuildReport,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::EmbeddingsStatus,
        handlers::health::LlmStatus,
        handlers::health::KnowledgeStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "resumes", description = "Résumé upload and retrieval"),
        (name = "jobs", description = "Job posting storage"),
        (name = "questions", description = "Interview questions, answers and answer help"),
        (name = "chat", description = "Conversational assistant"),
        (name = "generation", description = "Cover letters and résumé recommendations"),
        (name = "knowledge", description = "Knowledge store repair"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
