//! Live chat channel over WebSocket.
//!
//! `GET /ws?chatId=<id>&personId=<optional>` upgrades to a session bound to
//! one chat. On connect the chat is synced and its durable record is sent as
//! the first text frame. After that every text frame from the client is
//! appended as a message from `personId` and echoed back unchanged.
//!
//! Sessions are counted per chat in the [`SessionRegistry`]. When the last
//! session for a chat disconnects, one final sync runs so messages sent over
//! the channel reach the durable store without waiting for the scheduler.
//!
//! [`SessionRegistry`]: parley_core::chat::live::SessionRegistry

use axum::extract::rejection::QueryRejection;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;

use parley_types::chat::{ChatId, Message};

use crate::http::error::AppError;
use crate::state::AppState;

/// Query string of the live channel.
#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    #[serde(rename = "chatId", default)]
    pub chat_id: String,
    #[serde(rename = "personId", default)]
    pub person_id: Option<String>,
}

/// Validate the query and upgrade. Bad queries get a 400 before any upgrade.
pub async fn ws_handler(
    State(state): State<AppState>,
    query: Result<Query<LiveQuery>, QueryRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return AppError::from(rejection).into_response(),
    };
    if query.chat_id.trim().is_empty() {
        return AppError::Validation("chatId query parameter is required".to_string())
            .into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let chat_id = ChatId::from(query.chat_id);
    let sender_id = query.person_id.unwrap_or_default();
    ws.on_upgrade(move |socket| handle_session(socket, state, chat_id, sender_id))
}

async fn handle_session(socket: WebSocket, state: AppState, chat_id: ChatId, sender_id: String) {
    let (ws_sender, ws_receiver) = socket.split();
    run_session(ws_sender, ws_receiver, &state, &chat_id, &sender_id).await;
}

/// Run one session from registration to the final sync.
///
/// Generic over the frame sink and stream so the session can be driven
/// without a socket.
async fn run_session<S, R>(
    ws_sender: S,
    ws_receiver: R,
    state: &AppState,
    chat_id: &ChatId,
    sender_id: &str,
) where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
    R: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    let open = state.sessions.register(chat_id);
    tracing::info!(chat_id = %chat_id, sessions = open, "Live session opened");

    if let Err(err) = serve_session(ws_sender, ws_receiver, state, chat_id, sender_id).await {
        tracing::debug!(chat_id = %chat_id, error = %err, "Live session ended early");
    }

    if state.sessions.deregister(chat_id) {
        match state.coordinator.sync_messages(chat_id).await {
            Ok(report) => {
                tracing::info!(chat_id = %chat_id, added = report.added, "Synced after last session left");
            }
            Err(err) => {
                tracing::warn!(chat_id = %chat_id, error = %err, "Sync after last session left failed");
            }
        }
    } else {
        tracing::info!(chat_id = %chat_id, "Live session closed");
    }
}

/// Initial sync and payload, then the receive loop.
///
/// Returns on the first close frame, read error, failed append, or failed echo.
async fn serve_session<S, R>(
    mut ws_sender: S,
    mut ws_receiver: R,
    state: &AppState,
    chat_id: &ChatId,
    sender_id: &str,
) -> anyhow::Result<()>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
    R: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    state.coordinator.sync_messages(chat_id).await?;
    let record = state.coordinator.get_chat(chat_id).await?;
    let payload = serde_json::to_string(&record)?;
    ws_sender.send(WsMessage::Text(payload.into())).await?;

    while let Some(frame) = ws_receiver.next().await {
        match frame? {
            WsMessage::Text(text) => {
                let message = Message::now(sender_id, text.as_str());
                state.coordinator.add_message(chat_id, message).await?;
                ws_sender.send(WsMessage::Text(text)).await?;
            }
            WsMessage::Close(_) => break,
            // Binary, ping, and pong frames carry nothing for the chat.
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use parley_core::repository::volatile::VolatileMessageStore;
    use parley_infra::backend::Stores;
    use parley_types::chat::{ChatMeta, ChatRecord};
    use parley_types::config::ServiceConfig;

    fn state() -> AppState {
        AppState::from_stores(Stores::in_memory(), ServiceConfig::default())
    }

    fn text(frame: &WsMessage) -> &str {
        match frame {
            WsMessage::Text(text) => text.as_str(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    async fn run(
        state: &AppState,
        chat_id: &ChatId,
        frames: Vec<WsMessage>,
    ) -> Vec<WsMessage> {
        let mut sent: Vec<WsMessage> = Vec::new();
        let incoming = stream::iter(frames.into_iter().map(Ok::<_, axum::Error>));
        run_session(&mut sent, incoming, state, chat_id, "p1").await;
        sent
    }

    #[tokio::test]
    async fn test_session_sends_record_then_echoes_text() {
        let state = state();
        let chat_id = state
            .coordinator
            .create_chat(&ChatMeta::default())
            .await
            .unwrap();

        let sent = run(
            &state,
            &chat_id,
            vec![
                WsMessage::Text("hello".into()),
                WsMessage::Binary(vec![1u8, 2, 3].into()),
                WsMessage::Ping(Vec::<u8>::new().into()),
                WsMessage::Pong(Vec::<u8>::new().into()),
                WsMessage::Text("again".into()),
                WsMessage::Close(None),
            ],
        )
        .await;

        assert_eq!(sent.len(), 3);
        let first: ChatRecord = serde_json::from_str(text(&sent[0])).unwrap();
        assert_eq!(first.id, chat_id);
        assert!(first.messages.is_empty());
        assert_eq!(text(&sent[1]), "hello");
        assert_eq!(text(&sent[2]), "again");
    }

    #[tokio::test]
    async fn test_last_session_leaving_syncs_messages() {
        let state = state();
        let chat_id = state
            .coordinator
            .create_chat(&ChatMeta::default())
            .await
            .unwrap();

        run(&state, &chat_id, vec![WsMessage::Text("hello".into())]).await;

        let record = state.coordinator.get_chat(&chat_id).await.unwrap();
        assert_eq!(record.messages.len(), 1);
        assert_eq!(record.messages[0].body, "hello");
        assert_eq!(record.messages[0].sender_id, "p1");
        assert!(record.messages[0].id.is_some());
        assert_eq!(state.sessions.session_count(&chat_id), 0);
    }

    #[tokio::test]
    async fn test_other_open_session_defers_sync() {
        let state = state();
        let chat_id = state
            .coordinator
            .create_chat(&ChatMeta::default())
            .await
            .unwrap();
        state.sessions.register(&chat_id);

        run(&state, &chat_id, vec![WsMessage::Text("hello".into())]).await;

        let durable = state.coordinator.get_chat(&chat_id).await.unwrap();
        assert!(durable.messages.is_empty());
        let volatile = state.coordinator.volatile().get(&chat_id).await.unwrap();
        assert_eq!(volatile.messages.len(), 1);
        assert_eq!(state.sessions.session_count(&chat_id), 1);
    }

    #[tokio::test]
    async fn test_unknown_chat_closes_without_payload() {
        let state = state();
        let chat_id = ChatId::from("missing");

        let sent = run(&state, &chat_id, vec![WsMessage::Text("hello".into())]).await;

        assert!(sent.is_empty());
        assert!(state.sessions.is_empty());
    }
}
