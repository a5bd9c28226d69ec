//! Relationship (graph) store trait definition.

use std::future::Future;

use parley_types::chat::{ChatId, ChatMeta, ChatSummary, PersonId};
use parley_types::error::StoreError;

/// Owns chat identities and the person-participates-in-chat edges.
///
/// This is the most authoritative store: a chat exists once it has a node
/// here, whatever the other stores hold.
/// Implementations live in parley-infra (e.g., `SqliteRelationshipStore`).
pub trait RelationshipStore: Send + Sync {
    /// Allocate a new chat node and return its identity.
    ///
    /// `Connectivity` when the backend is unreachable, `Write` when the
    /// insert does not yield an identity.
    fn create_chat(
        &self,
        meta: &ChatMeta,
    ) -> impl Future<Output = Result<ChatId, StoreError>> + Send;

    /// Ensure a person node exists. Registering an existing person is a no-op.
    fn register_person(
        &self,
        person_id: &PersonId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Create the participates-in edge. Returns a human-readable status.
    ///
    /// `NotFound` when either the chat or the person does not resolve.
    /// Linking an existing edge again succeeds without a second edge.
    fn link_participant(
        &self,
        chat_id: &ChatId,
        person_id: &PersonId,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Remove the participates-in edge. `NotFound` when there is no edge.
    fn unlink_participant(
        &self,
        chat_id: &ChatId,
        person_id: &PersonId,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Chats the person participates in. Empty, not an error, when none.
    fn chats_for_participant(
        &self,
        person_id: &PersonId,
    ) -> impl Future<Output = Result<Vec<ChatSummary>, StoreError>> + Send;

    /// Look up a single chat node by identity.
    fn find_chat(
        &self,
        chat_id: &ChatId,
    ) -> impl Future<Output = Result<ChatSummary, StoreError>> + Send;

    /// Delete the chat node and every incident edge in one backend transaction.
    fn delete_chat(
        &self,
        chat_id: &ChatId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
