//! Periodic background sync of chats with live sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::coordinator::ChatCoordinator;
use crate::chat::live::SessionRegistry;
use crate::repository::durable::DurableMessageStore;
use crate::repository::relationship::RelationshipStore;
use crate::repository::volatile::VolatileMessageStore;

/// Runs `sync_messages` for every chat in the registry on a fixed period.
///
/// Chats without an open session are left alone; their last session's
/// disconnect already synced them.
pub struct SyncScheduler<R, D, V>
where
    R: RelationshipStore,
    D: DurableMessageStore,
    V: VolatileMessageStore,
{
    coordinator: Arc<ChatCoordinator<R, D, V>>,
    registry: Arc<SessionRegistry>,
    period: Duration,
}

impl<R, D, V> SyncScheduler<R, D, V>
where
    R: RelationshipStore + 'static,
    D: DurableMessageStore + 'static,
    V: VolatileMessageStore + 'static,
{
    pub fn new(
        coordinator: Arc<ChatCoordinator<R, D, V>>,
        registry: Arc<SessionRegistry>,
        period: Duration,
    ) -> Self {
        Self {
            coordinator,
            registry,
            period,
        }
    }

    /// Sync every live chat once. Returns how many syncs succeeded.
    ///
    /// A failure on one chat is logged and does not stop the others.
    pub async fn run_once(&self) -> usize {
        let chats = self.registry.active_chats();
        let mut synced = 0;
        for chat_id in &chats {
            match self.coordinator.sync_messages(chat_id).await {
                Ok(_) => synced += 1,
                Err(e) => warn!(chat_id = %chat_id, error = %e, "Background sync failed"),
            }
        }
        debug!(live = chats.len(), synced, "Background sync pass complete");
        synced
    }

    /// Start the periodic loop on the tokio runtime.
    ///
    /// Returns `None` when the period is zero. The loop exits once `shutdown`
    /// is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        if self.period.is_zero() {
            info!("Background sync disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            info!(period_secs = self.period.as_secs(), "Background sync started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                }
            }
            info!("Background sync stopped");
        }))
    }
}
