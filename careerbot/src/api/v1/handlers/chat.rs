//! v1 chat handlers.

use axum::extract::{Path, State};
use axum_extra::extract::Query;

use super::require_owner;
use crate::api::v1::dto::{ChatMessagesResponse, ChatTurnRequest, ExpireSessionResponse, OwnerQuery};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::{AppJson, AppState};
use crate::models::ChatReply;

/// `POST /api/v1/chat`
///
/// One conversational turn grounded in the owner's résumé, saved answers
/// and optionally a job posting.
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "chat",
    operation_id = "chat.send",
    request_body = ChatTurnRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatReply),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 503, description = "No language model configured", body = ApiError),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    AppJson(req): AppJson<ChatTurnRequest>,
) -> ApiResponse<ChatReply> {
    let (owner_id, request) = req.into_parts();
    if let Err(resp) = require_owner(&owner_id) {
        return resp;
    }

    match state.career.chat(&owner_id, request).await {
        Ok(reply) => ApiResponse::success(reply),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/chat/{chatId}/messages?ownerId=`
#[utoipa::path(
    get,
    path = "/api/v1/chat/{chatId}/messages",
    tag = "chat",
    operation_id = "chat.messages",
    params(("chatId" = String, Path, description = "Chat ID"), OwnerQuery),
    responses(
        (status = 200, description = "Messages in order", body = ChatMessagesResponse),
        (status = 404, description = "Chat not found", body = ApiError),
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResponse<ChatMessagesResponse> {
    match state.career.chat_messages(&query.owner_id, &chat_id).await {
        Ok(messages) => ApiResponse::success(ChatMessagesResponse { chat_id, messages }),
        Err(e) => e.into(),
    }
}

/// `DELETE /api/v1/chat/sessions/{sessionId}`
///
/// Drops the in-memory conversation state. Stored messages are kept.
#[utoipa::path(
    delete,
    path = "/api/v1/chat/sessions/{sessionId}",
    tag = "chat",
    operation_id = "chat.expireSession",
    params(("sessionId" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session expired", body = ExpireSessionResponse),
    )
)]
pub async fn expire_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResponse<ExpireSessionResponse> {
    let expired = state.career.expire_session(&session_id);
    ApiResponse::success(ExpireSessionResponse {
        session_id,
        expired,
    })
}
