//! In-memory task store for single-process hosts and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::root_task::{DesiredTaskState, RootTask};
use crate::storage::task_store::TaskStore;
use crate::utils::error::AppResult;

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    rows: DashMap<String, RootTask>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_by_id(&self, root_plan_id: &str) -> AppResult<Option<RootTask>> {
        Ok(self.rows.get(root_plan_id).map(|row| row.value().clone()))
    }

    async fn find_by_state(&self, state: DesiredTaskState) -> AppResult<Vec<RootTask>> {
        let mut rows: Vec<RootTask> = self
            .rows
            .iter()
            .filter(|row| row.desired_state == state)
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by_key(|t| t.last_updated);
        Ok(rows)
    }

    async fn find_all(&self) -> AppResult<Vec<RootTask>> {
        let mut rows: Vec<RootTask> = self.rows.iter().map(|row| row.value().clone()).collect();
        rows.sort_by_key(|t| t.last_updated);
        Ok(rows)
    }

    async fn find_ended_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<RootTask>> {
        let mut rows: Vec<RootTask> = self
            .rows
            .iter()
            .filter(|row| row.end_time.is_some_and(|end| end < cutoff))
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by_key(|t| t.end_time);
        Ok(rows)
    }

    async fn save(&self, task: &RootTask) -> AppResult<()> {
        self.rows.insert(task.root_plan_id.clone(), task.clone());
        Ok(())
    }

    async fn delete_by_id(&self, root_plan_id: &str) -> AppResult<bool> {
        Ok(self.rows.remove(root_plan_id).is_some())
    }

    async fn delete_many(&self, root_plan_ids: &[String]) -> AppResult<usize> {
        Ok(root_plan_ids
            .iter()
            .filter(|id| self.rows.remove(id.as_str()).is_some())
            .count())
    }
}
