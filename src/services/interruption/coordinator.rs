//! Interruption Coordinator
//!
//! Reads and writes the desired-state row of each root plan so that any
//! stateless worker can learn whether a plan should keep running.
//!
//! Read paths never fail: a missing row or a store error means "not
//! interrupted" / "not found", because a false interruption is worse than a
//! missed one under cooperative cancellation. Write paths return errors.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use plan_relay_core::events::{EventPublisher, NoopEventPublisher, PlanEvent};

use crate::models::root_task::{DesiredTaskState, RootTask};
use crate::storage::task_store::TaskStore;
use crate::utils::error::{AppError, AppResult};

pub struct InterruptionCoordinator {
    store: Arc<dyn TaskStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl InterruptionCoordinator {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            publisher: Arc::new(NoopEventPublisher),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    // ========================================================================
    // Reads (fail-open)
    // ========================================================================

    /// Current row for `root_plan_id`, or `None` when absent or unreadable.
    pub async fn get_task(&self, root_plan_id: &str) -> Option<RootTask> {
        if root_plan_id.trim().is_empty() {
            return None;
        }
        match self.store.find_by_id(root_plan_id).await {
            Ok(task) => task,
            Err(e) => {
                warn!("[Interruption] Failed to read task {}: {}", root_plan_id, e);
                None
            }
        }
    }

    pub async fn get_status(&self, root_plan_id: &str) -> Option<DesiredTaskState> {
        self.get_task(root_plan_id).await.map(|t| t.desired_state)
    }

    pub async fn task_exists(&self, root_plan_id: &str) -> bool {
        self.get_task(root_plan_id).await.is_some()
    }

    /// True iff a row exists and its desired state is STOP, CANCEL or PAUSE.
    pub async fn should_interrupt(&self, root_plan_id: &str) -> bool {
        self.get_task(root_plan_id)
            .await
            .map(|t| t.should_interrupt())
            .unwrap_or(false)
    }

    /// True iff a row exists and its desired state is START or RESUME.
    pub async fn is_running(&self, root_plan_id: &str) -> bool {
        self.get_task(root_plan_id)
            .await
            .map(|t| t.is_running())
            .unwrap_or(false)
    }

    /// Raise [`AppError::Interrupted`] if the plan has been asked to halt.
    ///
    /// Step loops call this between steps.
    pub async fn check_and_throw_if_interrupted(&self, root_plan_id: &str) -> AppResult<()> {
        let Some(task) = self.get_task(root_plan_id).await else {
            return Ok(());
        };
        if !task.should_interrupt() {
            return Ok(());
        }

        info!(
            "[Interruption] Task {} interrupted with state {}",
            root_plan_id, task.desired_state
        );
        self.publisher.publish(PlanEvent::PlanInterrupted {
            root_plan_id: root_plan_id.to_string(),
            state: task.desired_state.to_string(),
        });
        Err(AppError::interrupted(root_plan_id, task.desired_state.as_str()))
    }

    /// Root plans whose desired state is START or RESUME.
    pub async fn list_running_plan_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for state in [DesiredTaskState::Start, DesiredTaskState::Resume] {
            match self.store.find_by_state(state).await {
                Ok(tasks) => ids.extend(tasks.into_iter().map(|t| t.root_plan_id)),
                Err(e) => warn!("[Interruption] Failed to list {} tasks: {}", state, e),
            }
        }
        ids
    }

    pub async fn count_running(&self) -> usize {
        self.list_running_plan_ids().await.len()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Upsert the row and record `state`. Never requires a prior row.
    pub async fn create_or_update_task(
        &self,
        root_plan_id: &str,
        state: DesiredTaskState,
    ) -> AppResult<RootTask> {
        ensure_id(root_plan_id)?;
        let now = Utc::now();
        let task = match self.store.find_by_id(root_plan_id).await? {
            Some(mut existing) => {
                existing.apply_transition(state, now);
                existing
            }
            None => RootTask::new(root_plan_id, state, now),
        };
        self.store.save(&task).await?;
        debug!("[Interruption] Task {} set to {}", root_plan_id, state);
        Ok(task)
    }

    /// Request a desired-state transition.
    ///
    /// STOP, CANCEL and PAUSE require an existing row and return `Ok(None)`
    /// when there is none. START and RESUME upsert.
    pub async fn request_transition(
        &self,
        root_plan_id: &str,
        state: DesiredTaskState,
    ) -> AppResult<Option<RootTask>> {
        ensure_id(root_plan_id)?;
        if state.is_interrupting() && self.store.find_by_id(root_plan_id).await?.is_none() {
            warn!(
                "[Interruption] Cannot apply {} to unknown task {}",
                state, root_plan_id
            );
            return Ok(None);
        }
        let task = self.create_or_update_task(root_plan_id, state).await?;
        info!("[Interruption] Task {} transitioned to {}", root_plan_id, state);
        Ok(Some(task))
    }

    pub async fn stop_task(&self, root_plan_id: &str) -> bool {
        self.transition_flag(root_plan_id, DesiredTaskState::Stop).await
    }

    pub async fn cancel_task(&self, root_plan_id: &str) -> bool {
        self.transition_flag(root_plan_id, DesiredTaskState::Cancel).await
    }

    pub async fn pause_task(&self, root_plan_id: &str) -> bool {
        self.transition_flag(root_plan_id, DesiredTaskState::Pause).await
    }

    /// Resume a paused task. Unlike `request_transition`, requires an existing row.
    pub async fn resume_task(&self, root_plan_id: &str) -> bool {
        if !self.task_exists(root_plan_id).await {
            return false;
        }
        self.transition_flag(root_plan_id, DesiredTaskState::Resume).await
    }

    async fn transition_flag(&self, root_plan_id: &str, state: DesiredTaskState) -> bool {
        match self.request_transition(root_plan_id, state).await {
            Ok(task) => task.is_some(),
            Err(e) => {
                warn!(
                    "[Interruption] Failed to set task {} to {}: {}",
                    root_plan_id, state, e
                );
                false
            }
        }
    }

    /// Store the concluding result of a plan. `Ok(None)` when the row is missing.
    pub async fn update_task_result(
        &self,
        root_plan_id: &str,
        result: impl Into<String>,
    ) -> AppResult<Option<RootTask>> {
        ensure_id(root_plan_id)?;
        let Some(mut task) = self.store.find_by_id(root_plan_id).await? else {
            return Ok(None);
        };
        task.task_result = Some(result.into());
        task.last_updated = Utc::now();
        self.store.save(&task).await?;
        Ok(Some(task))
    }

    pub async fn delete_task(&self, root_plan_id: &str) -> AppResult<bool> {
        ensure_id(root_plan_id)?;
        self.store.delete_by_id(root_plan_id).await
    }

    /// Delete rows whose end time is older than `older_than_days`.
    pub async fn sweep_completed(&self, older_than_days: i64) -> AppResult<usize> {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        let expired: Vec<String> = self
            .store
            .find_ended_before(cutoff)
            .await?
            .into_iter()
            .map(|t| t.root_plan_id)
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }
        let removed = self.store.delete_many(&expired).await?;
        info!(
            "[Interruption] Swept {} tasks ended before {}",
            removed,
            cutoff.to_rfc3339()
        );
        Ok(removed)
    }
}

fn ensure_id(root_plan_id: &str) -> AppResult<()> {
    if root_plan_id.trim().is_empty() {
        return Err(AppError::validation("root plan id must not be empty"));
    }
    Ok(())
}
