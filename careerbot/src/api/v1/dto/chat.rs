//! Chat DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, ChatRequest};

/// Request body for `POST /v1/chat`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnRequest {
    pub owner_id: String,
    pub message: String,
    #[serde(default)]
    pub first_name: Option<String>,
    /// Session returned by an earlier turn. Unknown or expired sessions
    /// start a new conversation.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Job posting to draw context from.
    #[serde(default)]
    pub job_id: Option<String>,
}

impl ChatTurnRequest {
    pub fn into_parts(self) -> (String, ChatRequest) {
        (
            self.owner_id,
            ChatRequest {
                message: self.message,
                first_name: self.first_name,
                session_id: self.session_id,
                job_id: self.job_id,
            },
        )
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagesResponse {
    pub chat_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpireSessionResponse {
    pub session_id: String,
    /// `false` when the session had already expired.
    pub expired: bool,
}
