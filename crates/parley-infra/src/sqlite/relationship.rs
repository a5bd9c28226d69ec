//! SQLite implementation of `RelationshipStore`.
//!
//! Raw queries with private row types, reads on the reader pool and
//! mutations on the single writer.

use chrono::{DateTime, Utc};
use parley_core::repository::relationship::RelationshipStore;
use parley_types::chat::{ChatId, ChatMeta, ChatSummary, PersonId};
use parley_types::error::{StoreError, StoreKind};
use sqlx::Row;

use super::pool::DatabasePool;

/// Graph store over the `chats`, `persons`, and `participates_in` tables.
pub struct SqliteRelationshipStore {
    pool: DatabasePool,
}

impl SqliteRelationshipStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Open the pools at `database_url` and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = DatabasePool::new(database_url)
            .await
            .map_err(|e| StoreError::connectivity(StoreKind::Graph, "connect", e))?;
        Ok(Self::new(pool))
    }
}

// ---------------------------------------------------------------------------
// Private row type
// ---------------------------------------------------------------------------

struct ChatRow {
    id: String,
    date_created: String,
    is_active: bool,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            date_created: row.try_get("date_created")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn into_summary(self) -> Result<ChatSummary, StoreError> {
        Ok(ChatSummary {
            created_at: parse_datetime(&self.date_created)?,
            id: ChatId(self.id),
            active: self.is_active,
        })
    }
}

/// Pool exhaustion and I/O failures mean the backend is unreachable;
/// anything else is the database refusing the statement.
fn map_sqlx(operation: &'static str, e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::connectivity(StoreKind::Graph, operation, e)
        }
        other => StoreError::write(StoreKind::Graph, operation, other),
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::write(StoreKind::Graph, "decode", format!("invalid datetime: {e}")))
}

impl RelationshipStore for SqliteRelationshipStore {
    async fn create_chat(&self, meta: &ChatMeta) -> Result<ChatId, StoreError> {
        let chat_id = ChatId::generate();
        let created_at = meta.created_at.unwrap_or_else(Utc::now);

        let result = sqlx::query("INSERT INTO chats (id, date_created, is_active) VALUES (?, ?, ?)")
            .bind(chat_id.as_str())
            .bind(created_at.to_rfc3339())
            .bind(meta.active)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| map_sqlx("create_chat", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::write(
                StoreKind::Graph,
                "create_chat",
                "insert returned no identity",
            ));
        }

        tracing::debug!(chat_id = %chat_id, "Created chat node");
        Ok(chat_id)
    }

    async fn register_person(&self, person_id: &PersonId) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO persons (id) VALUES (?)")
            .bind(person_id.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| map_sqlx("register_person", e))?;
        Ok(())
    }

    async fn link_participant(
        &self,
        chat_id: &ChatId,
        person_id: &PersonId,
    ) -> Result<String, StoreError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| map_sqlx("link_participant", e))?;

        let chat = sqlx::query("SELECT 1 FROM chats WHERE id = ?")
            .bind(chat_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx("link_participant", e))?;
        if chat.is_none() {
            return Err(StoreError::not_found(StoreKind::Graph, chat_id));
        }

        let person = sqlx::query("SELECT 1 FROM persons WHERE id = ?")
            .bind(person_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx("link_participant", e))?;
        if person.is_none() {
            return Err(StoreError::not_found(StoreKind::Graph, person_id));
        }

        sqlx::query("INSERT OR IGNORE INTO participates_in (person_id, chat_id) VALUES (?, ?)")
            .bind(person_id.as_str())
            .bind(chat_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("link_participant", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx("link_participant", e))?;

        Ok(format!("Person {person_id} linked to chat {chat_id}"))
    }

    async fn unlink_participant(
        &self,
        chat_id: &ChatId,
        person_id: &PersonId,
    ) -> Result<String, StoreError> {
        let result = sqlx::query("DELETE FROM participates_in WHERE person_id = ? AND chat_id = ?")
            .bind(person_id.as_str())
            .bind(chat_id.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| map_sqlx("unlink_participant", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(
                StoreKind::Graph,
                format!("{person_id} -> {chat_id}"),
            ));
        }

        Ok(format!("Person {person_id} removed from chat {chat_id}"))
    }

    async fn chats_for_participant(
        &self,
        person_id: &PersonId,
    ) -> Result<Vec<ChatSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT c.id, c.date_created, c.is_active FROM chats c \
             JOIN participates_in p ON p.chat_id = c.id \
             WHERE p.person_id = ? ORDER BY c.date_created ASC",
        )
        .bind(person_id.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| map_sqlx("chats_for_participant", e))?;

        rows.iter()
            .map(|row| {
                ChatRow::from_row(row)
                    .map_err(|e| map_sqlx("chats_for_participant", e))?
                    .into_summary()
            })
            .collect()
    }

    async fn find_chat(&self, chat_id: &ChatId) -> Result<ChatSummary, StoreError> {
        let row = sqlx::query("SELECT id, date_created, is_active FROM chats WHERE id = ?")
            .bind(chat_id.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| map_sqlx("find_chat", e))?
            .ok_or_else(|| StoreError::not_found(StoreKind::Graph, chat_id))?;

        ChatRow::from_row(&row)
            .map_err(|e| map_sqlx("find_chat", e))?
            .into_summary()
    }

    /// Deleting a chat that does not exist is a no-op.
    async fn delete_chat(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| map_sqlx("delete_chat", e))?;

        // Edges go with the node through ON DELETE CASCADE.
        sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("delete_chat", e))?;

        tx.commit().await.map_err(|e| map_sqlx("delete_chat", e))?;

        tracing::debug!(chat_id = %chat_id, "Deleted chat node and edges");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_store() -> (SqliteRelationshipStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("graph.db").display());
        let store = SqliteRelationshipStore::connect(&url).await.unwrap();
        (store, dir)
    }

    fn meta_at(day: u32) -> ChatMeta {
        ChatMeta {
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap()),
            active: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_chat() {
        let (store, _dir) = test_store().await;

        let chat_id = store.create_chat(&meta_at(1)).await.unwrap();
        let found = store.find_chat(&chat_id).await.unwrap();

        assert_eq!(found.id, chat_id);
        assert_eq!(found.created_at, meta_at(1).created_at.unwrap());
        assert!(found.active);
    }

    #[tokio::test]
    async fn test_find_missing_chat_is_not_found() {
        let (store, _dir) = test_store().await;
        let err = store.find_chat(&ChatId::from("missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_link_and_list_in_creation_order() {
        let (store, _dir) = test_store().await;
        let later = store.create_chat(&meta_at(2)).await.unwrap();
        let earlier = store.create_chat(&meta_at(1)).await.unwrap();
        let person = PersonId::from("p1");
        store.register_person(&person).await.unwrap();
        // Registering twice is harmless.
        store.register_person(&person).await.unwrap();

        store.link_participant(&later, &person).await.unwrap();
        store.link_participant(&earlier, &person).await.unwrap();
        // Linking twice is harmless.
        store.link_participant(&earlier, &person).await.unwrap();

        let chats = store.chats_for_participant(&person).await.unwrap();
        let ids: Vec<_> = chats.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![earlier, later]);
    }

    #[tokio::test]
    async fn test_link_to_missing_chat_is_not_found() {
        let (store, _dir) = test_store().await;
        let person = PersonId::from("p1");
        store.register_person(&person).await.unwrap();

        let err = store
            .link_participant(&ChatId::from("missing"), &person)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_link_unregistered_person_is_not_found() {
        let (store, _dir) = test_store().await;
        let chat_id = store.create_chat(&meta_at(1)).await.unwrap();
        let person = PersonId::from("stranger");

        let err = store.link_participant(&chat_id, &person).await.unwrap_err();

        assert!(matches!(
            &err,
            StoreError::NotFound { store: StoreKind::Graph, key } if key == "stranger"
        ));
        assert!(store.chats_for_participant(&person).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unlink() {
        let (store, _dir) = test_store().await;
        let chat_id = store.create_chat(&meta_at(1)).await.unwrap();
        let person = PersonId::from("p1");
        store.register_person(&person).await.unwrap();
        store.link_participant(&chat_id, &person).await.unwrap();

        store.unlink_participant(&chat_id, &person).await.unwrap();

        assert!(store.chats_for_participant(&person).await.unwrap().is_empty());
        let err = store.unlink_participant(&chat_id, &person).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_person_has_no_chats() {
        let (store, _dir) = test_store().await;
        let chats = store
            .chats_for_participant(&PersonId::from("nobody"))
            .await
            .unwrap();
        assert!(chats.is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_edges() {
        let (store, _dir) = test_store().await;
        let chat_id = store.create_chat(&meta_at(1)).await.unwrap();
        let person = PersonId::from("p1");
        store.register_person(&person).await.unwrap();
        store.link_participant(&chat_id, &person).await.unwrap();

        store.delete_chat(&chat_id).await.unwrap();

        assert!(store.find_chat(&chat_id).await.unwrap_err().is_not_found());
        assert!(store.chats_for_participant(&person).await.unwrap().is_empty());
        // Second delete is a no-op.
        store.delete_chat(&chat_id).await.unwrap();
    }
}
