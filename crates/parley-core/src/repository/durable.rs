//! Durable message store trait definition.

use std::future::Future;

use parley_types::chat::{ChatId, ChatRecord, Message};
use parley_types::error::StoreError;

/// Owns the authoritative message history for each chat.
///
/// Implementations live in parley-infra (e.g., `MongoDurableStore`).
pub trait DurableMessageStore: Send + Sync {
    /// Insert a new record. Stamps `created_at` with the current time if unset.
    fn create_chat(
        &self,
        record: &ChatRecord,
    ) -> impl Future<Output = Result<ChatId, StoreError>> + Send;

    /// Append one message with an atomic push.
    ///
    /// A missing chat surfaces as `Write`; the store does not tell the two apart.
    fn append_message(
        &self,
        chat_id: &ChatId,
        message: &Message,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Flip `active` to false. The record and its messages stay.
    fn deactivate(&self, chat_id: &ChatId)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove the record entirely.
    fn delete(&self, chat_id: &ChatId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// `NotFound` when absent.
    fn find_by_id(
        &self,
        chat_id: &ChatId,
    ) -> impl Future<Output = Result<ChatRecord, StoreError>> + Send;

    /// Atomically overwrite the whole message sequence. The write side of sync.
    fn replace_messages(
        &self,
        chat_id: &ChatId,
        messages: &[Message],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
