//! Chat lifecycle and message HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/chats               - Create a chat in all three stores
//! - GET    /api/v1/chats/{id}          - Durable record, as of the last sync
//! - DELETE /api/v1/chats/{id}          - Delete from graph, durable, volatile
//! - POST   /api/v1/chats/{id}/messages - Append to the volatile store
//! - PUT    /api/v1/chats/{id}/sync     - Merge volatile into durable
//! - DELETE /api/v1/chats/{id}/volatile - Drop only the volatile record

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use parley_types::chat::{ChatId, ChatMeta, ChatRecord, Message, SyncReport};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// Request body for a new message. Only `body` is required.
#[derive(Debug, Deserialize)]
pub struct MessageInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Defaults to the time the request is handled.
    #[serde(default, alias = "timestamp")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, rename = "personElementId", alias = "senderId")]
    pub sender_id: String,
    pub body: String,
}

impl MessageInput {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            timestamp: self.date.unwrap_or_else(Utc::now),
            sender_id: self.sender_id,
            body: self.body,
        }
    }
}

/// POST /api/v1/chats - Create a chat.
pub async fn create_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatMeta>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let timer = RequestTimer::start();
    let Json(meta) = payload?;

    let chat_id = state.coordinator.create_chat(&meta).await?;

    let href = format!("/api/v1/chats/{chat_id}");
    let resp = timer
        .finish(json!({ "chatId": chat_id }))
        .with_link("self", &href)
        .with_link("messages", &format!("{href}/messages"));
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/chats/{id} - Get the durable chat record.
pub async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ChatRecord>>, AppError> {
    let timer = RequestTimer::start();
    let chat_id = ChatId::from(id);

    let record = state.coordinator.get_chat(&chat_id).await?;

    Ok(Json(
        timer
            .finish(record)
            .with_link("self", &format!("/api/v1/chats/{chat_id}")),
    ))
}

/// DELETE /api/v1/chats/{id} - Delete a chat everywhere.
pub async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    let chat_id = ChatId::from(id);

    state.coordinator.delete_chat(&chat_id).await?;

    Ok(Json(timer.finish(json!({
        "message": "Chat deleted",
        "chatId": chat_id,
    }))))
}

/// POST /api/v1/chats/{id}/messages - Append a message.
pub async fn add_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MessageInput>, JsonRejection>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    let Json(input) = payload?;
    let chat_id = ChatId::from(id);

    let stored = state
        .coordinator
        .add_message(&chat_id, input.into_message())
        .await?;

    Ok(Json(timer.finish(json!({ "message": stored }))))
}

/// PUT /api/v1/chats/{id}/sync - Merge volatile messages into the durable record.
pub async fn sync_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SyncReport>>, AppError> {
    let timer = RequestTimer::start();
    let chat_id = ChatId::from(id);

    let report = state.coordinator.sync_messages(&chat_id).await?;

    Ok(Json(timer.finish(report)))
}

/// DELETE /api/v1/chats/{id}/volatile - Drop the volatile record only.
pub async fn delete_volatile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    let chat_id = ChatId::from(id);

    state.coordinator.delete_volatile(&chat_id).await?;

    Ok(Json(timer.finish(json!({
        "message": "Volatile record deleted",
        "chatId": chat_id,
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_input_defaults_date_to_now() {
        let before = Utc::now();
        let input: MessageInput = serde_json::from_str(r#"{"body":"hi"}"#).unwrap();

        let message = input.into_message();

        assert!(message.timestamp >= before);
        assert_eq!(message.sender_id, "");
        assert!(message.id.is_none());
    }

    #[test]
    fn test_message_input_keeps_client_fields() {
        let input: MessageInput = serde_json::from_str(
            r#"{"date":"2024-05-01T12:00:00Z","personElementId":"p1","body":"hello"}"#,
        )
        .unwrap();

        let message = input.into_message();

        assert_eq!(message.timestamp.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert_eq!(message.sender_id, "p1");
        assert_eq!(message.body, "hello");
    }

    #[test]
    fn test_message_input_requires_body() {
        assert!(serde_json::from_str::<MessageInput>(r#"{"personElementId":"p1"}"#).is_err());
    }
}
