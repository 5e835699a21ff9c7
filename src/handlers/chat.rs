use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created, ApiJson};
use crate::{
    auth::AuthUser,
    entities::message,
    errors::ServiceError,
    services::chat::{ChatSummary, ChatView},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "otherUserId": "k3Jd92LxQwRt" }))]
pub struct CreateChatRequest {
    pub other_user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "receiverId": "k3Jd92LxQwRt", "text": "Is this still available?" }))]
pub struct SendMessageRequest {
    pub receiver_id: Option<String>,
    #[validate(length(max = 4000, message = "Message is too long"))]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub chat_id: String,
    pub marked_read: u64,
}

#[utoipa::path(
    get,
    path = "/api/stores/chats",
    responses(
        (status = 200, description = "Caller's chats, most recent first", body = ApiResponse<Vec<ChatSummary>>)
    ),
    security(("bearer_auth" = [])),
    tag = "chat"
)]
pub async fn list_chats(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Vec<ChatSummary>> {
    let chats = state.services.chat.list_chats(&caller.uid).await?;
    Ok(Json(ApiResponse::success(chats)))
}

#[utoipa::path(
    post,
    path = "/api/stores/chats",
    request_body = CreateChatRequest,
    responses(
        (status = 200, description = "Existing or new chat with the other user", body = ApiResponse<ChatView>),
        (status = 400, description = "Missing user or chat with self", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chat"
)]
pub async fn create_chat(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateChatRequest>,
) -> ApiResult<ChatView> {
    let chat = state
        .services
        .chat
        .get_or_create(&caller.uid, payload.other_user_id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(ApiResponse::success(chat.into())))
}

#[utoipa::path(
    get,
    path = "/api/stores/chats/{chatId}/messages",
    params(("chatId" = String, Path, description = "Chat ID")),
    responses(
        (status = 200, description = "Messages, oldest first", body = ApiResponse<Vec<message::Model>>),
        (status = 403, description = "Caller is not a participant", body = crate::errors::ErrorResponse),
        (status = 404, description = "Chat not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chat"
)]
pub async fn chat_messages(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(chat_id): Path<String>,
) -> ApiResult<Vec<message::Model>> {
    let messages = state.services.chat.messages(&caller.uid, &chat_id).await?;
    Ok(Json(ApiResponse::success(messages)))
}

#[utoipa::path(
    post,
    path = "/api/stores/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored and pushed to live subscribers", body = ApiResponse<message::Model>),
        (status = 400, description = "Missing receiver or text", body = crate::errors::ErrorResponse),
        (status = 404, description = "Recipient not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chat"
)]
pub async fn send_message(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<message::Model>>), ServiceError> {
    payload.validate()?;
    let message = state
        .services
        .chat
        .send_message(
            &caller.uid,
            payload.receiver_id.as_deref().unwrap_or_default(),
            payload.text.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(created(message))
}

#[utoipa::path(
    put,
    path = "/api/stores/chats/{chatId}/read",
    params(("chatId" = String, Path, description = "Chat ID")),
    responses(
        (status = 200, description = "Messages addressed to the caller marked read", body = ApiResponse<MarkReadResponse>),
        (status = 403, description = "Caller is not a participant", body = crate::errors::ErrorResponse),
        (status = 404, description = "Chat not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chat"
)]
pub async fn mark_chat_read(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(chat_id): Path<String>,
) -> ApiResult<MarkReadResponse> {
    let marked_read = state.services.chat.mark_read(&caller.uid, &chat_id).await?;
    Ok(Json(ApiResponse::success(MarkReadResponse {
        chat_id,
        marked_read,
    })))
}

/// Server-Sent Events feed of new messages in one chat. Each event is named
/// `message` and carries the stored message as JSON.
#[utoipa::path(
    get,
    path = "/api/stores/chats/{chatId}/stream",
    params(("chatId" = String, Path, description = "Chat ID")),
    responses(
        (status = 200, description = "text/event-stream of new messages", content_type = "text/event-stream"),
        (status = 403, description = "Caller is not a participant", body = crate::errors::ErrorResponse),
        (status = 404, description = "Chat not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "chat"
)]
pub async fn chat_stream(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    let receiver = state.services.chat.subscribe(&caller.uid, &chat_id).await?;

    let events = stream::unfold((receiver, chat_id), |(mut receiver, chat_id)| async move {
        loop {
            match receiver.recv().await {
                Ok(message) if message.chat_id == chat_id => {
                    match Event::default()
                        .event("message")
                        .id(message.message_id.clone())
                        .json_data(&message)
                    {
                        Ok(event) => return Some((Ok(event), (receiver, chat_id))),
                        Err(e) => warn!(error = %e, "Failed to encode chat event"),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(chat_id = %chat_id, skipped, "Chat stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
