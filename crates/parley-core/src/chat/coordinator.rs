//! Multi-store chat coordinator.
//!
//! `ChatCoordinator` is the single entry point for chat operations. It owns
//! one handle per store and fixes the order every multi-store operation
//! touches them in: graph, then durable, then volatile. That order is the
//! only consistency mechanism there is. A partial failure always leaves the
//! more authoritative stores holding a superset of the less authoritative
//! ones, and nothing is rolled back.

use parley_types::chat::{
    ChatId, ChatMeta, ChatRecord, ChatSummary, Message, ParticipantLink, PersonId, SyncReport,
};
use parley_types::config::{DedupStrategy, SyncConfig, VolatileRetention};
use parley_types::error::{CoordinatorError, StoreKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::merge::merge;
use crate::repository::durable::DurableMessageStore;
use crate::repository::relationship::RelationshipStore;
use crate::repository::volatile::VolatileMessageStore;

/// Sync behavior knobs, taken from the `[sync]` config section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncPolicy {
    pub dedup: DedupStrategy,
    pub retention: VolatileRetention,
}

impl From<&SyncConfig> for SyncPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            dedup: config.dedup,
            retention: config.volatile_retention,
        }
    }
}

/// Orchestrates writes across the relationship, durable, and volatile stores.
///
/// Generic over the three store traits; handles are injected at construction
/// and shared by every caller (wrap the coordinator in an `Arc`).
pub struct ChatCoordinator<R: RelationshipStore, D: DurableMessageStore, V: VolatileMessageStore> {
    relationships: R,
    durable: D,
    volatile: V,
    policy: SyncPolicy,
}

impl<R: RelationshipStore, D: DurableMessageStore, V: VolatileMessageStore>
    ChatCoordinator<R, D, V>
{
    pub fn new(relationships: R, durable: D, volatile: V, policy: SyncPolicy) -> Self {
        Self {
            relationships,
            durable,
            volatile,
            policy,
        }
    }

    pub fn relationships(&self) -> &R {
        &self.relationships
    }

    pub fn durable(&self) -> &D {
        &self.durable
    }

    pub fn volatile(&self) -> &V {
        &self.volatile
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    // --- Lifecycle ---

    /// Create a chat in all three stores and return its identity.
    ///
    /// 1. Mint the identity in the graph store. On failure nothing else runs.
    /// 2. Create the empty durable record.
    /// 3. Create the empty volatile record.
    ///
    /// A failure in step 2 or 3 returns `PartialCreate` naming the minted
    /// identity and the failed stage. Completed steps stay in place.
    pub async fn create_chat(&self, meta: &ChatMeta) -> Result<ChatId, CoordinatorError> {
        let chat_id = self.relationships.create_chat(meta).await?;
        let record = ChatRecord::new(chat_id.clone(), meta);

        if let Err(source) = self.durable.create_chat(&record).await {
            warn!(chat_id = %chat_id, stage = "durable", error = %source, "Chat left partially created");
            return Err(CoordinatorError::PartialCreate {
                chat_id,
                stage: StoreKind::Durable,
                source,
            });
        }

        if let Err(source) = self.volatile.create_chat(&record).await {
            warn!(chat_id = %chat_id, stage = "volatile", error = %source, "Chat left partially created");
            return Err(CoordinatorError::PartialCreate {
                chat_id,
                stage: StoreKind::Volatile,
                source,
            });
        }

        info!(chat_id = %chat_id, "Chat created");
        Ok(chat_id)
    }

    /// Delete a chat from graph, durable, and volatile, in that order.
    ///
    /// Stops at the first failure; later stores keep their data.
    pub async fn delete_chat(&self, chat_id: &ChatId) -> Result<(), CoordinatorError> {
        self.relationships
            .delete_chat(chat_id)
            .await
            .map_err(|source| CoordinatorError::Delete {
                stage: StoreKind::Graph,
                source,
            })?;

        self.durable
            .delete(chat_id)
            .await
            .map_err(|source| CoordinatorError::Delete {
                stage: StoreKind::Durable,
                source,
            })?;

        self.volatile
            .delete(chat_id)
            .await
            .map_err(|source| CoordinatorError::Delete {
                stage: StoreKind::Volatile,
                source,
            })?;

        info!(chat_id = %chat_id, "Chat deleted from all stores");
        Ok(())
    }

    /// Remove only the volatile record. Unsynced messages are lost.
    pub async fn delete_volatile(&self, chat_id: &ChatId) -> Result<(), CoordinatorError> {
        self.volatile.delete(chat_id).await?;
        info!(chat_id = %chat_id, "Volatile record deleted");
        Ok(())
    }

    /// Mark the durable record inactive. Not reachable over HTTP.
    pub async fn deactivate_chat(&self, chat_id: &ChatId) -> Result<(), CoordinatorError> {
        self.durable.deactivate(chat_id).await?;
        info!(chat_id = %chat_id, "Chat deactivated");
        Ok(())
    }

    // --- Messages ---

    /// Append a message to the volatile store only.
    ///
    /// Durability is deferred to `sync_messages`. A message without an id
    /// gets one here. Returns the message as stored.
    pub async fn add_message(
        &self,
        chat_id: &ChatId,
        mut message: Message,
    ) -> Result<Message, CoordinatorError> {
        if message.id.is_none() {
            message.id = Some(Uuid::now_v7());
        }
        self.volatile.append_message(chat_id, &message).await?;
        debug!(chat_id = %chat_id, "Message appended to volatile store");
        Ok(message)
    }

    /// The durable record, as of the last sync.
    pub async fn get_chat(&self, chat_id: &ChatId) -> Result<ChatRecord, CoordinatorError> {
        Ok(self.durable.find_by_id(chat_id).await?)
    }

    /// Merge the volatile record into the durable one.
    ///
    /// Both reads must succeed before anything is written. The merged,
    /// deduplicated, timestamp-ordered sequence replaces the durable messages
    /// in one write; if that write fails the durable record is unchanged.
    /// Under `TrimSynced` retention the merged volatile prefix is dropped
    /// afterwards. A failed trim is only logged, since the durable write has
    /// already committed and the next sync dedups the leftovers.
    pub async fn sync_messages(&self, chat_id: &ChatId) -> Result<SyncReport, CoordinatorError> {
        let volatile = self.volatile.get(chat_id).await?;
        let durable = self.durable.find_by_id(chat_id).await?;

        let merged = merge(&durable.messages, &volatile.messages, self.policy.dedup);
        let report = SyncReport {
            chat_id: chat_id.clone(),
            durable_before: durable.messages.len(),
            volatile_seen: volatile.messages.len(),
            added: merged.added,
            total: merged.messages.len(),
            trimmed: 0,
        };

        self.durable.replace_messages(chat_id, &merged.messages).await?;

        let report = match self.policy.retention {
            VolatileRetention::Keep => report,
            VolatileRetention::TrimSynced if volatile.messages.is_empty() => report,
            VolatileRetention::TrimSynced => {
                match self
                    .volatile
                    .trim_synced(chat_id, volatile.messages.len())
                    .await
                {
                    Ok(()) => SyncReport {
                        trimmed: volatile.messages.len(),
                        ..report
                    },
                    Err(e) => {
                        warn!(chat_id = %chat_id, error = %e, "Volatile trim after sync failed");
                        report
                    }
                }
            }
        };

        info!(
            chat_id = %chat_id,
            added = report.added,
            total = report.total,
            trimmed = report.trimmed,
            "Chat synced"
        );
        Ok(report)
    }

    // --- Participants ---

    pub async fn get_chats_for_person(
        &self,
        person_id: &PersonId,
    ) -> Result<Vec<ChatSummary>, CoordinatorError> {
        Ok(self.relationships.chats_for_participant(person_id).await?)
    }

    /// Create the person node so it can be linked to chats.
    pub async fn register_person(&self, person_id: &PersonId) -> Result<(), CoordinatorError> {
        self.relationships.register_person(person_id).await?;
        debug!(person_id = %person_id, "Person registered");
        Ok(())
    }

    pub async fn add_person_to_chat(
        &self,
        link: &ParticipantLink,
    ) -> Result<String, CoordinatorError> {
        Ok(self
            .relationships
            .link_participant(&link.chat_id, &link.person_id)
            .await?)
    }

    pub async fn remove_person_from_chat(
        &self,
        link: &ParticipantLink,
    ) -> Result<String, CoordinatorError> {
        Ok(self
            .relationships
            .unlink_participant(&link.chat_id, &link.person_id)
            .await?)
    }
}
