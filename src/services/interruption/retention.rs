//! Retention sweeper
//!
//! Periodically deletes root-task rows whose end time is older than the
//! configured retention window.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::settings::RuntimeConfig;

use super::coordinator::InterruptionCoordinator;

pub struct RetentionSweeper {
    coordinator: Arc<InterruptionCoordinator>,
    interval: Duration,
    older_than_days: i64,
}

impl RetentionSweeper {
    pub fn new(
        coordinator: Arc<InterruptionCoordinator>,
        interval: Duration,
        older_than_days: i64,
    ) -> Self {
        Self {
            coordinator,
            interval,
            older_than_days,
        }
    }

    pub fn from_config(coordinator: Arc<InterruptionCoordinator>, config: &RuntimeConfig) -> Self {
        Self::new(
            coordinator,
            Duration::from_secs(config.retention_sweep_interval_secs),
            config.task_retention_days,
        )
    }

    /// Run one sweep now. Errors are logged and reported as zero removals.
    pub async fn sweep_once(&self) -> usize {
        match self.coordinator.sweep_completed(self.older_than_days).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("[Retention] Sweep failed: {}", e);
                0
            }
        }
    }

    /// Start the sweep loop. The first sweep runs immediately; the loop exits
    /// once `cancellation_token` is cancelled.
    pub fn spawn(self, cancellation_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            info!(
                "[Retention] Sweeper started (every {:?}, retention {} days)",
                self.interval, self.older_than_days
            );
            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => {
                        debug!("[Retention] Sweeper cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.sweep_once().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::root_task::{DesiredTaskState, RootTask};
    use crate::storage::memory_store::InMemoryTaskStore;
    use crate::storage::task_store::TaskStore;
    use chrono::Utc;

    async fn seeded() -> (Arc<InterruptionCoordinator>, Arc<InMemoryTaskStore>) {
        let store = Arc::new(InMemoryTaskStore::new());
        let old = Utc::now() - chrono::Duration::days(30);
        let mut task = RootTask::new("expired", DesiredTaskState::Start, old);
        task.apply_transition(DesiredTaskState::Cancel, old);
        store.save(&task).await.unwrap();
        (Arc::new(InterruptionCoordinator::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_sweep_once() {
        let (coordinator, store) = seeded().await;
        let sweeper = RetentionSweeper::new(coordinator, Duration::from_secs(60), 7);
        assert_eq!(sweeper.sweep_once().await, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_sweeper_runs_and_stops() {
        let (coordinator, store) = seeded().await;
        let token = CancellationToken::new();
        let handle =
            RetentionSweeper::new(coordinator, Duration::from_millis(10), 7).spawn(token.clone());

        for _ in 0..50 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.is_empty());

        token.cancel();
        handle.await.unwrap();
    }
}
