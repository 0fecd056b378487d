use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CareerError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The relational store and the knowledge store may disagree until the
    /// owner's knowledge is rebuilt.
    #[error("Partial write risk: {0}")]
    PartialWriteRisk(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Knowledge store error: {0}")]
    KnowledgeStore(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API rate limit exceeded, retry after {retry_after:?} seconds")]
    ApiRateLimit { retry_after: Option<u64> },

    #[error("API authentication error: {0}")]
    ApiAuth(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl CareerError {
    /// Upstream provider failures that a read path may degrade on.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            CareerError::ProviderUnavailable(_)
                | CareerError::ApiRateLimit { .. }
                | CareerError::ApiAuth(_)
                | CareerError::Http(_)
                | CareerError::Llm(_)
                | CareerError::KnowledgeStore(_)
        )
    }
}

impl IntoResponse for CareerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CareerError::UnsupportedFormat(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg.clone()),
            CareerError::Extraction(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            CareerError::ProviderUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            CareerError::MalformedModelOutput(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            CareerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CareerError::PartialWriteRisk(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            CareerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CareerError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            CareerError::KnowledgeStore(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            CareerError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            CareerError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            CareerError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            CareerError::ApiRateLimit { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            CareerError::ApiAuth(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            CareerError::Llm(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            CareerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CareerError>;
