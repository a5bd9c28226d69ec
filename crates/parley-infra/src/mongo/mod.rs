//! MongoDB implementation of `DurableMessageStore`.
//!
//! One document per chat, `{id, dateCreated, isActive, messages}`, with a
//! unique index on `id`. Records pass through `serde_json::Value` on the way
//! in and out so the stored shape matches the JSON wire shape exactly.

use std::future::IntoFuture;
use std::time::Duration;

use bson::{Bson, Document, doc};
use chrono::Utc;
use mongodb::error::ErrorKind;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use parley_core::repository::durable::DurableMessageStore;
use parley_types::chat::{ChatId, ChatRecord, Message};
use parley_types::config::DurableConfig;
use parley_types::error::{StoreError, StoreKind};
use serde::Serialize;

/// Durable chat history in a MongoDB collection.
pub struct MongoDurableStore {
    collection: Collection<Document>,
    op_timeout: Duration,
}

impl MongoDurableStore {
    pub fn new(collection: Collection<Document>, op_timeout: Duration) -> Self {
        Self {
            collection,
            op_timeout,
        }
    }

    /// Build a client from `config.uri` and ensure the `id` index exists.
    pub async fn connect(config: &DurableConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| map_mongo("connect", e))?;
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);
        let store = Self::new(collection, Duration::from_millis(config.op_timeout_ms));

        let index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        store
            .timed("create_index", store.collection.create_index(index))
            .await?;

        Ok(store)
    }

    /// Run one driver call under the per-operation timeout.
    async fn timed<T>(
        &self,
        operation: &'static str,
        call: impl IntoFuture<Output = mongodb::error::Result<T>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.op_timeout, call).await {
            Ok(result) => result.map_err(|e| map_mongo(operation, e)),
            Err(_) => Err(StoreError::connectivity(
                StoreKind::Durable,
                operation,
                format!("timed out after {}ms", self.op_timeout.as_millis()),
            )),
        }
    }
}

fn map_mongo(operation: &'static str, e: mongodb::error::Error) -> StoreError {
    match e.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => {
            StoreError::connectivity(StoreKind::Durable, operation, e)
        }
        _ => StoreError::write(StoreKind::Durable, operation, e),
    }
}

fn by_id(chat_id: &ChatId) -> Document {
    doc! { "id": chat_id.as_str() }
}

fn to_bson<T: Serialize>(operation: &'static str, value: &T) -> Result<Bson, StoreError> {
    let json = serde_json::to_value(value)
        .map_err(|e| StoreError::write(StoreKind::Durable, operation, e))?;
    bson::to_bson(&json).map_err(|e| StoreError::write(StoreKind::Durable, operation, e))
}

fn record_to_document(record: &ChatRecord) -> Result<Document, StoreError> {
    match to_bson("create_chat", record)? {
        Bson::Document(document) => Ok(document),
        other => Err(StoreError::write(
            StoreKind::Durable,
            "create_chat",
            format!("record encoded as {:?}, not a document", other.element_type()),
        )),
    }
}

fn document_to_record(mut document: Document) -> Result<ChatRecord, StoreError> {
    document.remove("_id");
    let json = Bson::Document(document).into_relaxed_extjson();
    serde_json::from_value(json).map_err(|e| {
        StoreError::write(StoreKind::Durable, "decode", format!("malformed chat document: {e}"))
    })
}

impl DurableMessageStore for MongoDurableStore {
    async fn create_chat(&self, record: &ChatRecord) -> Result<ChatId, StoreError> {
        let mut record = record.clone();
        record.created_at.get_or_insert_with(Utc::now);
        let document = record_to_document(&record)?;

        self.timed("create_chat", self.collection.insert_one(document))
            .await?;

        tracing::debug!(chat_id = %record.id, "Created durable record");
        Ok(record.id)
    }

    async fn append_message(&self, chat_id: &ChatId, message: &Message) -> Result<(), StoreError> {
        let message = to_bson("append_message", message)?;
        let result = self
            .timed(
                "append_message",
                self.collection
                    .update_one(by_id(chat_id), doc! { "$push": { "messages": message } }),
            )
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::write(
                StoreKind::Durable,
                "append_message",
                format!("no chat '{chat_id}' to append to"),
            ));
        }
        Ok(())
    }

    async fn deactivate(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        let result = self
            .timed(
                "deactivate",
                self.collection
                    .update_one(by_id(chat_id), doc! { "$set": { "isActive": false } }),
            )
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::not_found(StoreKind::Durable, chat_id));
        }
        Ok(())
    }

    async fn delete(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.timed("delete", self.collection.delete_one(by_id(chat_id)))
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, chat_id: &ChatId) -> Result<ChatRecord, StoreError> {
        let document = self
            .timed("find_by_id", self.collection.find_one(by_id(chat_id)))
            .await?
            .ok_or_else(|| StoreError::not_found(StoreKind::Durable, chat_id))?;
        document_to_record(document)
    }

    async fn replace_messages(
        &self,
        chat_id: &ChatId,
        messages: &[Message],
    ) -> Result<(), StoreError> {
        let messages = to_bson("replace_messages", &messages)?;
        let result = self
            .timed(
                "replace_messages",
                self.collection
                    .update_one(by_id(chat_id), doc! { "$set": { "messages": messages } }),
            )
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::not_found(StoreKind::Durable, chat_id));
        }
        Ok(())
    }
}
