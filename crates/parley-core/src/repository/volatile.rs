//! Volatile message store trait definition.

use std::future::Future;

use parley_types::chat::{ChatId, ChatRecord, Message};
use parley_types::error::StoreError;

/// Low-latency store for newly arriving messages, keyed by chat identity.
///
/// Records never expire on their own; they live until deleted. Messages are
/// only ever appended at the end, which is what lets `trim_synced` drop a
/// merged prefix without touching later arrivals.
/// Implementations live in parley-infra (e.g., `RedisVolatileStore`).
pub trait VolatileMessageStore: Send + Sync {
    /// Write a full snapshot with no expiry.
    fn create_chat(
        &self,
        record: &ChatRecord,
    ) -> impl Future<Output = Result<ChatId, StoreError>> + Send;

    /// `NotFound` when absent.
    fn get(&self, chat_id: &ChatId)
    -> impl Future<Output = Result<ChatRecord, StoreError>> + Send;

    /// Full overwrite of the record, not a patch.
    fn update(&self, record: &ChatRecord)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Append one message atomically with respect to other appends on the
    /// same chat. `NotFound` when the chat has no record.
    fn append_message(
        &self,
        chat_id: &ChatId,
        message: &Message,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically drop the first `count` messages.
    fn trim_synced(
        &self,
        chat_id: &ChatId,
        count: usize,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete(&self, chat_id: &ChatId) -> impl Future<Output = Result<(), StoreError>> + Send;
}
