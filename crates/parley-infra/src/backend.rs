//! Store wiring from configuration.
//!
//! Picks the adapter family named by `backend.kind`, connects each store,
//! and erases the concrete types so the rest of the service sees one
//! coordinator type regardless of backend.

use std::path::Path;

use parley_core::chat::coordinator::{ChatCoordinator, SyncPolicy};
use parley_core::repository::boxed::{
    BoxDurableMessageStore, BoxRelationshipStore, BoxVolatileMessageStore,
};
use parley_core::repository::durable::DurableMessageStore;
use parley_core::repository::relationship::RelationshipStore;
use parley_core::repository::volatile::VolatileMessageStore;
use parley_types::chat::ChatId;
use parley_types::config::{BackendKind, ServiceConfig};
use parley_types::error::{StoreError, StoreKind};

use crate::memory::{MemoryDurableStore, MemoryRelationshipStore, MemoryVolatileStore};
use crate::mongo::MongoDurableStore;
use crate::cache::RedisVolatileStore;
use crate::sqlite::pool::default_database_url;
use crate::sqlite::relationship::SqliteRelationshipStore;

/// Coordinator over runtime-selected stores.
pub type AppCoordinator =
    ChatCoordinator<BoxRelationshipStore, BoxDurableMessageStore, BoxVolatileMessageStore>;

/// One connected handle per store role.
pub struct Stores {
    pub relationships: BoxRelationshipStore,
    pub durable: BoxDurableMessageStore,
    pub volatile: BoxVolatileMessageStore,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            relationships: BoxRelationshipStore::new(MemoryRelationshipStore::new()),
            durable: BoxDurableMessageStore::new(MemoryDurableStore::new()),
            volatile: BoxVolatileMessageStore::new(MemoryVolatileStore::new()),
        }
    }

    /// Connect every store named by `config`.
    ///
    /// For the external family an empty `graph.database_url` means
    /// `{data_dir}/graph.db`; the directory is created if needed.
    pub async fn connect(config: &ServiceConfig, data_dir: &Path) -> Result<Self, StoreError> {
        match config.backend.kind {
            BackendKind::Memory => Ok(Self::in_memory()),
            BackendKind::External => {
                let graph_url = if config.graph.database_url.is_empty() {
                    tokio::fs::create_dir_all(data_dir).await.map_err(|e| {
                        StoreError::connectivity(StoreKind::Graph, "connect", e)
                    })?;
                    default_database_url(data_dir)
                } else {
                    config.graph.database_url.clone()
                };

                let relationships = SqliteRelationshipStore::connect(&graph_url).await?;
                let durable = MongoDurableStore::connect(&config.durable).await?;
                let volatile = RedisVolatileStore::connect(&config.volatile).await?;

                tracing::info!(
                    graph = %graph_url,
                    durable = %config.durable.database,
                    "Connected external stores"
                );
                Ok(Self {
                    relationships: BoxRelationshipStore::new(relationships),
                    durable: BoxDurableMessageStore::new(durable),
                    volatile: BoxVolatileMessageStore::new(volatile),
                })
            }
        }
    }

    pub fn into_coordinator(self, policy: SyncPolicy) -> AppCoordinator {
        ChatCoordinator::new(self.relationships, self.durable, self.volatile, policy)
    }
}

/// Check that each store answers a lookup.
///
/// Looks up a fresh random identity in every store; `NotFound` is the
/// expected healthy answer.
pub async fn check_backends(coordinator: &AppCoordinator) -> Vec<(StoreKind, Result<(), StoreError>)> {
    let lookup_id = ChatId::generate();

    let graph = coordinator.relationships().find_chat(&lookup_id).await.map(drop);
    let durable = coordinator.durable().find_by_id(&lookup_id).await.map(drop);
    let volatile = coordinator.volatile().get(&lookup_id).await.map(drop);

    [
        (StoreKind::Graph, graph),
        (StoreKind::Durable, durable),
        (StoreKind::Volatile, volatile),
    ]
    .into_iter()
    .map(|(kind, result)| match result {
        Err(e) if e.is_not_found() => (kind, Ok(())),
        other => (kind, other),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::chat::ChatMeta;

    #[tokio::test]
    async fn test_memory_backend_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let stores = Stores::connect(&ServiceConfig::default(), tmp.path())
            .await
            .unwrap();
        let coordinator = stores.into_coordinator(SyncPolicy::default());

        let chat_id = coordinator.create_chat(&ChatMeta::default()).await.unwrap();
        assert!(coordinator.get_chat(&chat_id).await.is_ok());
        // Nothing was written to disk.
        assert!(!tmp.path().join("graph.db").exists());
    }

    #[tokio::test]
    async fn test_check_backends_memory_is_healthy() {
        let coordinator = Stores::in_memory().into_coordinator(SyncPolicy::default());

        let results = check_backends(&coordinator).await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
    }

    #[tokio::test]
    async fn test_external_backend_fails_on_unreachable_store() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::default();
        config.backend.kind = BackendKind::External;
        config.durable.uri = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200".to_string();
        config.durable.op_timeout_ms = 1_000;

        let err = match Stores::connect(&config, tmp.path()).await {
            Ok(_) => panic!("expected connect to fail"),
            Err(e) => e,
        };

        assert!(matches!(err, StoreError::Connectivity { store: StoreKind::Durable, .. }));
        // The graph store connected first and created its database.
        assert!(tmp.path().join("graph.db").exists());
    }
}
