//! # V1 API Response Envelope & Error Contract
//!
//! Every v1 endpoint returns an [`ApiResponse<T>`] envelope:
//!
//! ```json
//! {
//!   "data": { ... },                                       // present on success
//!   "error": { "code": "not_found", "message": "..." }     // present on error
//! }
//! ```
//!
//! ## ID Formats
//!
//! - **jobId**, **questionId**, **chatId**: nanoid, 21 characters
//! - **sessionId**: UUID v4
//! - **ownerId**: supplied by the caller, opaque to the service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::CareerError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire. Each variant maps to a
/// fixed HTTP status code via [`ErrorCode::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed request or failed validation. HTTP 400.
    InvalidRequest,
    /// The owner has no such résumé, job, question or chat. HTTP 404.
    NotFound,
    /// The uploaded file is not a PDF or DOCX document. HTTP 415.
    UnsupportedMediaType,
    /// The document is of a supported type but its text could not be read.
    /// HTTP 422.
    Unprocessable,
    /// The language model or vector index answered with something unusable.
    /// HTTP 502.
    BadGateway,
    /// A provider is not configured, unreachable or rate limited. HTTP 503.
    ServiceUnavailable,
    /// Unexpected server-side error. Details are never leaked. HTTP 500.
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::NotFound => write!(f, "not_found"),
            Self::UnsupportedMediaType => write!(f, "unsupported_media_type"),
            Self::Unprocessable => write!(f, "unprocessable"),
            Self::BadGateway => write!(f, "bad_gateway"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

/// Structured error payload within the API envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to display to end users.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Resource created response (HTTP 201).
    pub fn created(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::CREATED,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<CareerError> for ApiResponse<T> {
    /// Internal error details are never leaked to the client; they are
    /// logged and replaced by a generic message.
    fn from(err: CareerError) -> Self {
        match err {
            CareerError::NotFound(ref msg) => ApiResponse::error(ErrorCode::NotFound, msg.clone()),

            CareerError::Validation(ref msg) => {
                ApiResponse::error(ErrorCode::InvalidRequest, msg.clone())
            }

            CareerError::Json(ref e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            CareerError::UnsupportedFormat(ref msg) => {
                ApiResponse::error(ErrorCode::UnsupportedMediaType, msg.clone())
            }

            CareerError::Extraction(ref msg) => {
                ApiResponse::error(ErrorCode::Unprocessable, msg.clone())
            }

            CareerError::MalformedModelOutput(_) => {
                tracing::warn!(error = %err, "Model output rejected");
                ApiResponse::error(
                    ErrorCode::BadGateway,
                    "The language model returned an unusable response",
                )
            }

            CareerError::ProviderUnavailable(ref msg) => {
                ApiResponse::error(ErrorCode::ServiceUnavailable, msg.clone())
            }

            CareerError::ApiRateLimit { retry_after } => {
                let msg = match retry_after {
                    Some(secs) => format!("Provider rate limit exceeded, retry after {secs} seconds"),
                    None => "Provider rate limit exceeded".to_string(),
                };
                ApiResponse::error(ErrorCode::ServiceUnavailable, msg)
            }

            ref upstream @ (CareerError::ApiAuth(_)
            | CareerError::Llm(_)
            | CareerError::Http(_)
            | CareerError::KnowledgeStore(_)) => {
                tracing::error!(error = %upstream, "Upstream error mapped to v1 response");
                ApiResponse::error(ErrorCode::BadGateway, "An upstream provider request failed")
            }

            CareerError::PartialWriteRisk(_) => {
                tracing::error!(error = %err, "Stores may disagree until knowledge is rebuilt");
                ApiResponse::error(
                    ErrorCode::InternalError,
                    "The write did not complete; rebuild this owner's knowledge",
                )
            }

            ref internal @ (CareerError::Database(_)
            | CareerError::Io(_)
            | CareerError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}
