//! Interview question DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::models::{InterviewQuestion, QuestionKind};

/// Request body for `POST /v1/questions:generate`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsRequest {
    pub owner_id: String,
    /// Required for `role` questions; scopes exclusions for both kinds.
    #[serde(default)]
    pub job_id: Option<String>,
    pub kind: QuestionKind,
    /// Number of questions to ask for, 1 to 10 (default 3).
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct GenerateQuestionsResponse {
    pub questions: Vec<InterviewQuestion>,
}

/// Request body for `PUT /v1/questions/{questionId}/answer`. A blank answer
/// clears the saved one.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnswerRequest {
    pub owner_id: String,
    pub answer: String,
}

/// Request body for `POST /v1/questions/{questionId}:help`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerHelpRequest {
    pub owner_id: String,
    /// The user's current answer. When present the model refines it,
    /// otherwise it drafts one.
    #[serde(default)]
    pub answer: Option<String>,
}
