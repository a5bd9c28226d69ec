//! One-shot sync command.

use anyhow::Result;

use parley_types::chat::ChatId;

use crate::state::AppState;

/// Sync `chat_id` once and print the report as JSON.
pub async fn sync_chat(state: &AppState, chat_id: &str) -> Result<()> {
    let chat_id = ChatId::from(chat_id);
    let report = state.coordinator.sync_messages(&chat_id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
