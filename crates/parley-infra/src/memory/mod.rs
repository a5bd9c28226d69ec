//! In-process store implementations backed by `DashMap`.
//!
//! Used by `backend.kind = "memory"` and by tests. Each store is a cheap
//! `Clone` handle over shared maps. Nothing survives a restart.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parley_core::repository::durable::DurableMessageStore;
use parley_core::repository::relationship::RelationshipStore;
use parley_core::repository::volatile::VolatileMessageStore;
use parley_types::chat::{ChatId, ChatMeta, ChatRecord, ChatSummary, Message, PersonId};
use parley_types::error::{StoreError, StoreKind};

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryRelationshipStore {
    chats: Arc<DashMap<ChatId, ChatSummary>>,
    /// One entry per registered person, holding the chats they are linked to.
    edges: Arc<DashMap<PersonId, BTreeSet<ChatId>>>,
}

impl MemoryRelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RelationshipStore for MemoryRelationshipStore {
    async fn create_chat(&self, meta: &ChatMeta) -> Result<ChatId, StoreError> {
        let chat_id = ChatId::generate();
        self.chats.insert(
            chat_id.clone(),
            ChatSummary {
                id: chat_id.clone(),
                created_at: meta.created_at.unwrap_or_else(Utc::now),
                active: meta.active,
            },
        );
        Ok(chat_id)
    }

    async fn register_person(&self, person_id: &PersonId) -> Result<(), StoreError> {
        self.edges.entry(person_id.clone()).or_default();
        Ok(())
    }

    async fn link_participant(
        &self,
        chat_id: &ChatId,
        person_id: &PersonId,
    ) -> Result<String, StoreError> {
        if !self.chats.contains_key(chat_id) {
            return Err(StoreError::not_found(StoreKind::Graph, chat_id));
        }
        let Some(mut chats) = self.edges.get_mut(person_id) else {
            return Err(StoreError::not_found(StoreKind::Graph, person_id));
        };
        chats.insert(chat_id.clone());
        Ok(format!("Person {person_id} linked to chat {chat_id}"))
    }

    async fn unlink_participant(
        &self,
        chat_id: &ChatId,
        person_id: &PersonId,
    ) -> Result<String, StoreError> {
        let removed = self
            .edges
            .get_mut(person_id)
            .map(|mut chats| chats.remove(chat_id))
            .unwrap_or(false);
        if !removed {
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
        let linked: Vec<ChatId> = self
            .edges
            .get(person_id)
            .map(|chats| chats.iter().cloned().collect())
            .unwrap_or_default();

        let mut summaries: Vec<ChatSummary> = linked
            .iter()
            .filter_map(|id| self.chats.get(id).map(|c| c.clone()))
            .collect();
        summaries.sort_by_key(|c| c.created_at);
        Ok(summaries)
    }

    async fn find_chat(&self, chat_id: &ChatId) -> Result<ChatSummary, StoreError> {
        self.chats
            .get(chat_id)
            .map(|c| c.clone())
            .ok_or_else(|| StoreError::not_found(StoreKind::Graph, chat_id))
    }

    async fn delete_chat(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.chats.remove(chat_id);
        for mut chats in self.edges.iter_mut() {
            chats.remove(chat_id);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Durable
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryDurableStore {
    records: Arc<DashMap<ChatId, ChatRecord>>,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableMessageStore for MemoryDurableStore {
    async fn create_chat(&self, record: &ChatRecord) -> Result<ChatId, StoreError> {
        let mut record = record.clone();
        record.created_at.get_or_insert_with(Utc::now);
        let chat_id = record.id.clone();
        self.records.insert(chat_id.clone(), record);
        Ok(chat_id)
    }

    async fn append_message(&self, chat_id: &ChatId, message: &Message) -> Result<(), StoreError> {
        let mut record = self.records.get_mut(chat_id).ok_or_else(|| {
            StoreError::write(
                StoreKind::Durable,
                "append_message",
                format!("no chat '{chat_id}' to append to"),
            )
        })?;
        record.messages.push(message.clone());
        Ok(())
    }

    async fn deactivate(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(chat_id)
            .ok_or_else(|| StoreError::not_found(StoreKind::Durable, chat_id))?;
        record.active = false;
        Ok(())
    }

    async fn delete(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.records.remove(chat_id);
        Ok(())
    }

    async fn find_by_id(&self, chat_id: &ChatId) -> Result<ChatRecord, StoreError> {
        self.records
            .get(chat_id)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::not_found(StoreKind::Durable, chat_id))
    }

    async fn replace_messages(
        &self,
        chat_id: &ChatId,
        messages: &[Message],
    ) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(chat_id)
            .ok_or_else(|| StoreError::not_found(StoreKind::Durable, chat_id))?;
        record.messages = messages.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Volatile
// ---------------------------------------------------------------------------

/// Appends and trims run under the map's per-entry write lock.
#[derive(Clone, Default)]
pub struct MemoryVolatileStore {
    records: Arc<DashMap<ChatId, ChatRecord>>,
}

impl MemoryVolatileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VolatileMessageStore for MemoryVolatileStore {
    async fn create_chat(&self, record: &ChatRecord) -> Result<ChatId, StoreError> {
        let mut record = record.clone();
        record.created_at.get_or_insert_with(Utc::now);
        let chat_id = record.id.clone();
        self.records.insert(chat_id.clone(), record);
        Ok(chat_id)
    }

    async fn get(&self, chat_id: &ChatId) -> Result<ChatRecord, StoreError> {
        self.records
            .get(chat_id)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::not_found(StoreKind::Volatile, chat_id))
    }

    async fn update(&self, record: &ChatRecord) -> Result<(), StoreError> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn append_message(&self, chat_id: &ChatId, message: &Message) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(chat_id)
            .ok_or_else(|| StoreError::not_found(StoreKind::Volatile, chat_id))?;
        record.messages.push(message.clone());
        Ok(())
    }

    async fn trim_synced(&self, chat_id: &ChatId, count: usize) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(chat_id)
            .ok_or_else(|| StoreError::not_found(StoreKind::Volatile, chat_id))?;
        let count = count.min(record.messages.len());
        record.messages.drain(..count);
        Ok(())
    }

    async fn delete(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.records.remove(chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use parley_core::chat::coordinator::{ChatCoordinator, SyncPolicy};
    use parley_types::chat::ParticipantLink;
    use parley_types::config::VolatileRetention;
    use parley_types::error::CoordinatorError;

    type MemoryCoordinator =
        ChatCoordinator<MemoryRelationshipStore, MemoryDurableStore, MemoryVolatileStore>;

    fn coordinator(policy: SyncPolicy) -> MemoryCoordinator {
        ChatCoordinator::new(
            MemoryRelationshipStore::new(),
            MemoryDurableStore::new(),
            MemoryVolatileStore::new(),
            policy,
        )
    }

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn msg(minute: u32, sender: &str, body: &str) -> Message {
        Message {
            id: None,
            timestamp: t(minute),
            sender_id: sender.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_add_add_sync() {
        let coord = coordinator(SyncPolicy::default());
        let meta = ChatMeta {
            created_at: Some(t(0)),
            active: true,
        };
        let chat_id = coord.create_chat(&meta).await.unwrap();

        coord.add_message(&chat_id, msg(1, "u1", "hi")).await.unwrap();
        coord.add_message(&chat_id, msg(2, "u2", "there")).await.unwrap();
        let report = coord.sync_messages(&chat_id).await.unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.total, 2);
        let durable = coord.get_chat(&chat_id).await.unwrap();
        let got: Vec<_> = durable
            .messages
            .iter()
            .map(|m| (m.timestamp, m.body.as_str()))
            .collect();
        assert_eq!(got, vec![(t(1), "hi"), (t(2), "there")]);
    }

    #[tokio::test]
    async fn test_message_in_both_stores_stored_once() {
        let coord = coordinator(SyncPolicy::default());
        let chat_id = coord.create_chat(&ChatMeta::default()).await.unwrap();
        let shared = msg(3, "u1", "dup");
        coord
            .durable()
            .append_message(&chat_id, &shared)
            .await
            .unwrap();
        coord
            .volatile()
            .append_message(&chat_id, &shared)
            .await
            .unwrap();

        coord.sync_messages(&chat_id).await.unwrap();

        let durable = coord.get_chat(&chat_id).await.unwrap();
        assert_eq!(durable.messages, vec![shared]);
    }

    #[tokio::test]
    async fn test_delete_removes_chat_from_participant_lookup() {
        let coord = coordinator(SyncPolicy::default());
        let chat_id = coord.create_chat(&ChatMeta::default()).await.unwrap();
        let link = ParticipantLink {
            person_id: PersonId::from("p1"),
            chat_id: chat_id.clone(),
        };
        coord.register_person(&link.person_id).await.unwrap();
        coord.add_person_to_chat(&link).await.unwrap();

        coord.delete_chat(&chat_id).await.unwrap();

        let chats = coord.get_chats_for_person(&link.person_id).await.unwrap();
        assert!(!chats.iter().any(|c| c.id == chat_id));
    }

    #[tokio::test]
    async fn test_partial_create_leaves_graph_node_visible() {
        struct RejectingDurable;

        impl DurableMessageStore for RejectingDurable {
            async fn create_chat(&self, _: &ChatRecord) -> Result<ChatId, StoreError> {
                Err(StoreError::connectivity(StoreKind::Durable, "create_chat", "down"))
            }
            async fn append_message(&self, _: &ChatId, _: &Message) -> Result<(), StoreError> {
                unreachable!()
            }
            async fn deactivate(&self, _: &ChatId) -> Result<(), StoreError> {
                unreachable!()
            }
            async fn delete(&self, _: &ChatId) -> Result<(), StoreError> {
                unreachable!()
            }
            async fn find_by_id(&self, _: &ChatId) -> Result<ChatRecord, StoreError> {
                unreachable!()
            }
            async fn replace_messages(&self, _: &ChatId, _: &[Message]) -> Result<(), StoreError> {
                unreachable!()
            }
        }

        let graph = MemoryRelationshipStore::new();
        let coord = ChatCoordinator::new(
            graph.clone(),
            RejectingDurable,
            MemoryVolatileStore::new(),
            SyncPolicy::default(),
        );

        let err = coord.create_chat(&ChatMeta::default()).await.unwrap_err();
        let CoordinatorError::PartialCreate { chat_id, stage, .. } = err else {
            panic!("expected PartialCreate");
        };

        assert_eq!(stage, StoreKind::Durable);
        assert_eq!(graph.find_chat(&chat_id).await.unwrap().id, chat_id);
    }

    #[tokio::test]
    async fn test_trim_retention_keeps_late_arrivals() {
        let coord = coordinator(SyncPolicy {
            retention: VolatileRetention::TrimSynced,
            ..SyncPolicy::default()
        });
        let chat_id = coord.create_chat(&ChatMeta::default()).await.unwrap();
        coord.add_message(&chat_id, msg(1, "u1", "a")).await.unwrap();
        coord.sync_messages(&chat_id).await.unwrap();
        coord.add_message(&chat_id, msg(2, "u1", "b")).await.unwrap();

        let volatile = coord.volatile().get(&chat_id).await.unwrap();
        assert_eq!(volatile.messages.len(), 1);
        assert_eq!(volatile.messages[0].body, "b");

        coord.sync_messages(&chat_id).await.unwrap();
        assert_eq!(coord.get_chat(&chat_id).await.unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let coord = Arc::new(coordinator(SyncPolicy::default()));
        let chat_id = coord.create_chat(&ChatMeta::default()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..50 {
            let coord = coord.clone();
            let chat_id = chat_id.clone();
            handles.push(tokio::spawn(async move {
                coord
                    .add_message(&chat_id, Message::now("u1", format!("m{i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(coord.volatile().get(&chat_id).await.unwrap().messages.len(), 50);
    }

    #[tokio::test]
    async fn test_participant_lookup_sorted_by_creation() {
        let graph = MemoryRelationshipStore::new();
        let late = graph
            .create_chat(&ChatMeta {
                created_at: Some(t(9)),
                active: true,
            })
            .await
            .unwrap();
        let early = graph
            .create_chat(&ChatMeta {
                created_at: Some(t(1)),
                active: true,
            })
            .await
            .unwrap();
        let person = PersonId::from("p1");
        let err = graph.link_participant(&late, &person).await.unwrap_err();
        assert!(err.is_not_found());

        graph.register_person(&person).await.unwrap();
        graph.link_participant(&late, &person).await.unwrap();
        graph.link_participant(&early, &person).await.unwrap();

        let ids: Vec<_> = graph
            .chats_for_participant(&person)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![early, late]);
    }

    #[tokio::test]
    async fn test_durable_append_to_missing_chat_is_write_error() {
        let durable = MemoryDurableStore::new();
        let err = durable
            .append_message(&ChatId::from("missing"), &msg(1, "u1", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }
}
