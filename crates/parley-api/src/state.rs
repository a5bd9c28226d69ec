//! Application state shared by the CLI commands and the HTTP layer.
//!
//! The coordinator is generic over its stores; `AppState` pins it to the
//! boxed store types so the backend family can be picked from config.

use std::path::Path;
use std::sync::Arc;

use parley_core::chat::coordinator::SyncPolicy;
use parley_core::chat::live::SessionRegistry;
use parley_infra::backend::{AppCoordinator, Stores};
use parley_types::config::ServiceConfig;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<AppCoordinator>,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// Connect the configured stores and wire the coordinator.
    ///
    /// `data_dir` holds the default SQLite graph database.
    pub async fn init(config: ServiceConfig, data_dir: &Path) -> anyhow::Result<Self> {
        let stores = Stores::connect(&config, data_dir).await?;
        Ok(Self::from_stores(stores, config))
    }

    pub fn from_stores(stores: Stores, config: ServiceConfig) -> Self {
        let coordinator = stores.into_coordinator(SyncPolicy::from(&config.sync));
        Self {
            coordinator: Arc::new(coordinator),
            sessions: Arc::new(SessionRegistry::new()),
            config: Arc::new(config),
        }
    }
}
