//! Redis implementation of `VolatileMessageStore`.
//!
//! Each chat uses two keys, neither with a TTL:
//! - `{prefix}{id}`: the record JSON without messages
//! - `{prefix}{id}:messages`: a LIST of message JSON in arrival order
//!
//! Keeping messages in a list makes append a single server-side RPUSH and
//! trimming a single LTRIM, so concurrent appends to one chat never lose
//! each other's writes.

use chrono::{DateTime, Utc};
use parley_core::repository::volatile::VolatileMessageStore;
use parley_types::chat::{ChatId, ChatRecord, Message};
use parley_types::config::VolatileConfig;
use parley_types::error::{StoreError, StoreKind};
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};

/// Appends only when the record key exists. Returns 0 when it does not,
/// otherwise the new list length.
const APPEND_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
return redis.call('RPUSH', KEYS[2], ARGV[1])
"#;

/// Record fields stored under the record key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredMeta {
    id: ChatId,
    #[serde(rename = "dateCreated", default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "isActive")]
    active: bool,
}

/// Volatile message store backed by one multiplexed Redis connection.
pub struct RedisVolatileStore {
    connection: MultiplexedConnection,
    prefix: String,
    append: redis::Script,
}

impl RedisVolatileStore {
    pub fn new(connection: MultiplexedConnection, prefix: impl Into<String>) -> Self {
        Self {
            connection,
            prefix: prefix.into(),
            append: redis::Script::new(APPEND_SCRIPT),
        }
    }

    pub async fn connect(config: &VolatileConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::connectivity(StoreKind::Volatile, "connect", e))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis("connect", e))?;
        Ok(Self::new(connection, config.key_prefix.clone()))
    }

    fn record_key(&self, chat_id: &ChatId) -> String {
        record_key(&self.prefix, chat_id)
    }

    fn messages_key(&self, chat_id: &ChatId) -> String {
        messages_key(&self.prefix, chat_id)
    }

    /// Overwrite both keys of a record in one MULTI block.
    async fn write_record(
        &self,
        operation: &'static str,
        record: &ChatRecord,
    ) -> Result<(), StoreError> {
        let meta = StoredMeta {
            id: record.id.clone(),
            created_at: record.created_at,
            active: record.active,
        };
        let meta = encode(operation, &meta)?;
        let messages = record
            .messages
            .iter()
            .map(|m| encode(operation, m))
            .collect::<Result<Vec<_>, _>>()?;

        let record_key = self.record_key(&record.id);
        let messages_key = self.messages_key(&record.id);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(&record_key, meta)
            .ignore()
            .del(&messages_key)
            .ignore();
        if !messages.is_empty() {
            pipe.rpush(&messages_key, messages).ignore();
        }

        let mut con = self.connection.clone();
        pipe.query_async::<()>(&mut con)
            .await
            .map_err(|e| map_redis(operation, e))
    }
}

fn record_key(prefix: &str, chat_id: &ChatId) -> String {
    format!("{prefix}{chat_id}")
}

fn messages_key(prefix: &str, chat_id: &ChatId) -> String {
    format!("{prefix}{chat_id}:messages")
}

fn map_redis(operation: &'static str, e: redis::RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_timeout() || e.is_connection_dropped()
    {
        StoreError::connectivity(StoreKind::Volatile, operation, e)
    } else {
        StoreError::write(StoreKind::Volatile, operation, e)
    }
}

fn encode<T: Serialize>(operation: &'static str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::write(StoreKind::Volatile, operation, e))
}

fn decode<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| {
        StoreError::write(StoreKind::Volatile, "decode", format!("malformed cached value: {e}"))
    })
}

impl VolatileMessageStore for RedisVolatileStore {
    async fn create_chat(&self, record: &ChatRecord) -> Result<ChatId, StoreError> {
        let mut record = record.clone();
        record.created_at.get_or_insert_with(Utc::now);
        self.write_record("create_chat", &record).await?;
        tracing::debug!(chat_id = %record.id, "Created volatile record");
        Ok(record.id)
    }

    async fn get(&self, chat_id: &ChatId) -> Result<ChatRecord, StoreError> {
        let mut con = self.connection.clone();
        let (meta, messages): (Option<String>, Vec<String>) = redis::pipe()
            .atomic()
            .get(self.record_key(chat_id))
            .lrange(self.messages_key(chat_id), 0, -1)
            .query_async(&mut con)
            .await
            .map_err(|e| map_redis("get", e))?;

        let meta: StoredMeta = match meta {
            Some(raw) => decode(&raw)?,
            None => return Err(StoreError::not_found(StoreKind::Volatile, chat_id)),
        };
        let messages = messages
            .iter()
            .map(|raw| decode::<Message>(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ChatRecord {
            id: meta.id,
            created_at: meta.created_at,
            active: meta.active,
            messages,
        })
    }

    async fn update(&self, record: &ChatRecord) -> Result<(), StoreError> {
        self.write_record("update", record).await
    }

    async fn append_message(&self, chat_id: &ChatId, message: &Message) -> Result<(), StoreError> {
        let payload = encode("append_message", message)?;
        let mut con = self.connection.clone();
        let length: i64 = self
            .append
            .key(self.record_key(chat_id))
            .key(self.messages_key(chat_id))
            .arg(payload)
            .invoke_async(&mut con)
            .await
            .map_err(|e| map_redis("append_message", e))?;

        if length == 0 {
            return Err(StoreError::not_found(StoreKind::Volatile, chat_id));
        }
        Ok(())
    }

    async fn trim_synced(&self, chat_id: &ChatId, count: usize) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        let (exists,): (bool,) = redis::pipe()
            .atomic()
            .exists(self.record_key(chat_id))
            .ltrim(self.messages_key(chat_id), count as isize, -1)
            .ignore()
            .query_async(&mut con)
            .await
            .map_err(|e| map_redis("trim_synced", e))?;

        if !exists {
            return Err(StoreError::not_found(StoreKind::Volatile, chat_id));
        }
        Ok(())
    }

    async fn delete(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        redis::cmd("DEL")
            .arg(self.record_key(chat_id))
            .arg(self.messages_key(chat_id))
            .query_async::<()>(&mut con)
            .await
            .map_err(|e| map_redis("delete", e))
    }
}
