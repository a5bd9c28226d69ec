//! Object-safe dynamic dispatch wrappers for the store traits.
//!
//! The store traits use RPITIT, so they cannot be trait objects directly.
//! Each trait gets:
//! 1. An object-safe `*Dyn` trait with boxed futures
//! 2. A blanket impl of that trait for every implementor of the store trait
//! 3. A `Box*` wrapper that implements the store trait by delegating
//!
//! This lets the backend family be chosen at runtime from configuration
//! while the coordinator stays generic.

use std::future::Future;
use std::pin::Pin;

use parley_types::chat::{ChatId, ChatMeta, ChatRecord, ChatSummary, Message, PersonId};
use parley_types::error::StoreError;

use super::durable::DurableMessageStore;
use super::relationship::RelationshipStore;
use super::volatile::VolatileMessageStore;

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// Relationship store
// ---------------------------------------------------------------------------

pub trait RelationshipStoreDyn: Send + Sync {
    fn create_chat_boxed<'a>(&'a self, meta: &'a ChatMeta) -> StoreFuture<'a, ChatId>;
    fn register_person_boxed<'a>(&'a self, person_id: &'a PersonId) -> StoreFuture<'a, ()>;
    fn link_participant_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        person_id: &'a PersonId,
    ) -> StoreFuture<'a, String>;
    fn unlink_participant_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        person_id: &'a PersonId,
    ) -> StoreFuture<'a, String>;
    fn chats_for_participant_boxed<'a>(
        &'a self,
        person_id: &'a PersonId,
    ) -> StoreFuture<'a, Vec<ChatSummary>>;
    fn find_chat_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ChatSummary>;
    fn delete_chat_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ()>;
}

impl<T: RelationshipStore> RelationshipStoreDyn for T {
    fn create_chat_boxed<'a>(&'a self, meta: &'a ChatMeta) -> StoreFuture<'a, ChatId> {
        Box::pin(self.create_chat(meta))
    }

    fn register_person_boxed<'a>(&'a self, person_id: &'a PersonId) -> StoreFuture<'a, ()> {
        Box::pin(self.register_person(person_id))
    }

    fn link_participant_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        person_id: &'a PersonId,
    ) -> StoreFuture<'a, String> {
        Box::pin(self.link_participant(chat_id, person_id))
    }

    fn unlink_participant_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        person_id: &'a PersonId,
    ) -> StoreFuture<'a, String> {
        Box::pin(self.unlink_participant(chat_id, person_id))
    }

    fn chats_for_participant_boxed<'a>(
        &'a self,
        person_id: &'a PersonId,
    ) -> StoreFuture<'a, Vec<ChatSummary>> {
        Box::pin(self.chats_for_participant(person_id))
    }

    fn find_chat_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ChatSummary> {
        Box::pin(self.find_chat(chat_id))
    }

    fn delete_chat_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ()> {
        Box::pin(self.delete_chat(chat_id))
    }
}

/// Type-erased relationship store for runtime backend selection.
pub struct BoxRelationshipStore {
    inner: Box<dyn RelationshipStoreDyn>,
}

impl BoxRelationshipStore {
    pub fn new<T: RelationshipStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }
}

impl RelationshipStore for BoxRelationshipStore {
    async fn create_chat(&self, meta: &ChatMeta) -> Result<ChatId, StoreError> {
        self.inner.create_chat_boxed(meta).await
    }

    async fn register_person(&self, person_id: &PersonId) -> Result<(), StoreError> {
        self.inner.register_person_boxed(person_id).await
    }

    async fn link_participant(
        &self,
        chat_id: &ChatId,
        person_id: &PersonId,
    ) -> Result<String, StoreError> {
        self.inner.link_participant_boxed(chat_id, person_id).await
    }

    async fn unlink_participant(
        &self,
        chat_id: &ChatId,
        person_id: &PersonId,
    ) -> Result<String, StoreError> {
        self.inner.unlink_participant_boxed(chat_id, person_id).await
    }

    async fn chats_for_participant(
        &self,
        person_id: &PersonId,
    ) -> Result<Vec<ChatSummary>, StoreError> {
        self.inner.chats_for_participant_boxed(person_id).await
    }

    async fn find_chat(&self, chat_id: &ChatId) -> Result<ChatSummary, StoreError> {
        self.inner.find_chat_boxed(chat_id).await
    }

    async fn delete_chat(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.inner.delete_chat_boxed(chat_id).await
    }
}

// ---------------------------------------------------------------------------
// Durable store
// ---------------------------------------------------------------------------

pub trait DurableMessageStoreDyn: Send + Sync {
    fn create_chat_boxed<'a>(&'a self, record: &'a ChatRecord) -> StoreFuture<'a, ChatId>;
    fn append_message_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message: &'a Message,
    ) -> StoreFuture<'a, ()>;
    fn deactivate_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ()>;
    fn delete_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ()>;
    fn find_by_id_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ChatRecord>;
    fn replace_messages_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        messages: &'a [Message],
    ) -> StoreFuture<'a, ()>;
}

impl<T: DurableMessageStore> DurableMessageStoreDyn for T {
    fn create_chat_boxed<'a>(&'a self, record: &'a ChatRecord) -> StoreFuture<'a, ChatId> {
        Box::pin(self.create_chat(record))
    }

    fn append_message_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message: &'a Message,
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.append_message(chat_id, message))
    }

    fn deactivate_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ()> {
        Box::pin(self.deactivate(chat_id))
    }

    fn delete_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ()> {
        Box::pin(self.delete(chat_id))
    }

    fn find_by_id_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ChatRecord> {
        Box::pin(self.find_by_id(chat_id))
    }

    fn replace_messages_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        messages: &'a [Message],
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.replace_messages(chat_id, messages))
    }
}

/// Type-erased durable store for runtime backend selection.
pub struct BoxDurableMessageStore {
    inner: Box<dyn DurableMessageStoreDyn>,
}

impl BoxDurableMessageStore {
    pub fn new<T: DurableMessageStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }
}

impl DurableMessageStore for BoxDurableMessageStore {
    async fn create_chat(&self, record: &ChatRecord) -> Result<ChatId, StoreError> {
        self.inner.create_chat_boxed(record).await
    }

    async fn append_message(&self, chat_id: &ChatId, message: &Message) -> Result<(), StoreError> {
        self.inner.append_message_boxed(chat_id, message).await
    }

    async fn deactivate(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.inner.deactivate_boxed(chat_id).await
    }

    async fn delete(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.inner.delete_boxed(chat_id).await
    }

    async fn find_by_id(&self, chat_id: &ChatId) -> Result<ChatRecord, StoreError> {
        self.inner.find_by_id_boxed(chat_id).await
    }

    async fn replace_messages(
        &self,
        chat_id: &ChatId,
        messages: &[Message],
    ) -> Result<(), StoreError> {
        self.inner.replace_messages_boxed(chat_id, messages).await
    }
}

// ---------------------------------------------------------------------------
// Volatile store
// ---------------------------------------------------------------------------

pub trait VolatileMessageStoreDyn: Send + Sync {
    fn create_chat_boxed<'a>(&'a self, record: &'a ChatRecord) -> StoreFuture<'a, ChatId>;
    fn get_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ChatRecord>;
    fn update_boxed<'a>(&'a self, record: &'a ChatRecord) -> StoreFuture<'a, ()>;
    fn append_message_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message: &'a Message,
    ) -> StoreFuture<'a, ()>;
    fn trim_synced_boxed<'a>(&'a self, chat_id: &'a ChatId, count: usize) -> StoreFuture<'a, ()>;
    fn delete_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ()>;
}

impl<T: VolatileMessageStore> VolatileMessageStoreDyn for T {
    fn create_chat_boxed<'a>(&'a self, record: &'a ChatRecord) -> StoreFuture<'a, ChatId> {
        Box::pin(self.create_chat(record))
    }

    fn get_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ChatRecord> {
        Box::pin(self.get(chat_id))
    }

    fn update_boxed<'a>(&'a self, record: &'a ChatRecord) -> StoreFuture<'a, ()> {
        Box::pin(self.update(record))
    }

    fn append_message_boxed<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message: &'a Message,
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.append_message(chat_id, message))
    }

    fn trim_synced_boxed<'a>(&'a self, chat_id: &'a ChatId, count: usize) -> StoreFuture<'a, ()> {
        Box::pin(self.trim_synced(chat_id, count))
    }

    fn delete_boxed<'a>(&'a self, chat_id: &'a ChatId) -> StoreFuture<'a, ()> {
        Box::pin(self.delete(chat_id))
    }
}

/// Type-erased volatile store for runtime backend selection.
pub struct BoxVolatileMessageStore {
    inner: Box<dyn VolatileMessageStoreDyn>,
}

impl BoxVolatileMessageStore {
    pub fn new<T: VolatileMessageStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }
}

impl VolatileMessageStore for BoxVolatileMessageStore {
    async fn create_chat(&self, record: &ChatRecord) -> Result<ChatId, StoreError> {
        self.inner.create_chat_boxed(record).await
    }

    async fn get(&self, chat_id: &ChatId) -> Result<ChatRecord, StoreError> {
        self.inner.get_boxed(chat_id).await
    }

    async fn update(&self, record: &ChatRecord) -> Result<(), StoreError> {
        self.inner.update_boxed(record).await
    }

    async fn append_message(&self, chat_id: &ChatId, message: &Message) -> Result<(), StoreError> {
        self.inner.append_message_boxed(chat_id, message).await
    }

    async fn trim_synced(&self, chat_id: &ChatId, count: usize) -> Result<(), StoreError> {
        self.inner.trim_synced_boxed(chat_id, count).await
    }

    async fn delete(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.inner.delete_boxed(chat_id).await
    }
}
