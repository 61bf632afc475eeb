//! Task Store
//!
//! Durable table of one [`RootTask`] per root plan. The store has no domain
//! logic: it upserts, reads and deletes whole rows. Concurrent writers
//! simply overwrite each other (last write wins).
//!
//! [`SqliteTaskStore`] is the production implementation; blocking rusqlite
//! calls run on the blocking pool via `spawn_blocking`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::models::root_task::{DesiredTaskState, RootTask};
use crate::storage::database::{Database, DbPool};
use crate::utils::error::{AppError, AppResult};

/// Keyed-by-root-plan-id storage for desired-state rows.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_by_id(&self, root_plan_id: &str) -> AppResult<Option<RootTask>>;

    async fn find_by_state(&self, state: DesiredTaskState) -> AppResult<Vec<RootTask>>;

    async fn find_all(&self) -> AppResult<Vec<RootTask>>;

    /// Rows whose end time is set and earlier than `cutoff`.
    async fn find_ended_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<RootTask>>;

    /// Insert or replace the row for `task.root_plan_id`.
    async fn save(&self, task: &RootTask) -> AppResult<()>;

    /// Returns whether a row was removed.
    async fn delete_by_id(&self, root_plan_id: &str) -> AppResult<bool>;

    /// Returns how many rows were removed.
    async fn delete_many(&self, root_plan_ids: &[String]) -> AppResult<usize>;
}

/// SQLite-backed task store.
pub struct SqliteTaskStore {
    pool: DbPool,
}

impl SqliteTaskStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> AppResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))?;
            f(&*conn)
        })
        .await
        .map_err(|e| AppError::database(format!("Task join error: {}", e)))?
    }
}

const SELECT_COLUMNS: &str =
    "SELECT root_plan_id, desired_state, start_time, end_time, last_updated, task_result FROM root_tasks";

/// Raw row as stored, before timestamp and state parsing
struct RawTaskRow {
    root_plan_id: String,
    desired_state: String,
    start_time: Option<String>,
    end_time: Option<String>,
    last_updated: String,
    task_result: Option<String>,
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTaskRow> {
    Ok(RawTaskRow {
        root_plan_id: row.get(0)?,
        desired_state: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        last_updated: row.get(4)?,
        task_result: row.get(5)?,
    })
}

fn parse_time(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_row(raw: RawTaskRow) -> AppResult<RootTask> {
    Ok(RootTask {
        desired_state: raw.desired_state.parse()?,
        start_time: raw.start_time.as_deref().map(parse_time).transpose()?,
        end_time: raw.end_time.as_deref().map(parse_time).transpose()?,
        last_updated: parse_time(&raw.last_updated)?,
        task_result: raw.task_result,
        root_plan_id: raw.root_plan_id,
    })
}

fn query_rows(
    conn: &rusqlite::Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> AppResult<Vec<RootTask>> {
    let mut stmt = conn.prepare(sql)?;
    let raws = stmt
        .query_map(params, read_raw)?
        .collect::<Result<Vec<_>, _>>()?;
    raws.into_iter().map(parse_row).collect()
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn find_by_id(&self, root_plan_id: &str) -> AppResult<Option<RootTask>> {
        let id = root_plan_id.to_string();
        self.with_conn(move |conn| {
            let raw = conn
                .query_row(
                    &format!("{} WHERE root_plan_id = ?1", SELECT_COLUMNS),
                    params![id],
                    read_raw,
                )
                .optional()?;
            raw.map(parse_row).transpose()
        })
        .await
    }

    async fn find_by_state(&self, state: DesiredTaskState) -> AppResult<Vec<RootTask>> {
        self.with_conn(move |conn| {
            query_rows(
                conn,
                &format!("{} WHERE desired_state = ?1 ORDER BY last_updated", SELECT_COLUMNS),
                params![state.as_str()],
            )
        })
        .await
    }

    async fn find_all(&self) -> AppResult<Vec<RootTask>> {
        self.with_conn(|conn| {
            query_rows(conn, &format!("{} ORDER BY last_updated", SELECT_COLUMNS), [])
        })
        .await
    }

    async fn find_ended_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<RootTask>> {
        // RFC3339 in UTC from `to_rfc3339` sorts lexically in time order.
        let cutoff = cutoff.to_rfc3339();
        self.with_conn(move |conn| {
            query_rows(
                conn,
                &format!(
                    "{} WHERE end_time IS NOT NULL AND end_time < ?1 ORDER BY end_time",
                    SELECT_COLUMNS
                ),
                params![cutoff],
            )
        })
        .await
    }

    async fn save(&self, task: &RootTask) -> AppResult<()> {
        let task = task.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO root_tasks
                 (root_plan_id, desired_state, start_time, end_time, last_updated, task_result)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    task.root_plan_id,
                    task.desired_state.as_str(),
                    task.start_time.map(|t| t.to_rfc3339()),
                    task.end_time.map(|t| t.to_rfc3339()),
                    task.last_updated.to_rfc3339(),
                    task.task_result,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_by_id(&self, root_plan_id: &str) -> AppResult<bool> {
        let id = root_plan_id.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM root_tasks WHERE root_plan_id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn delete_many(&self, root_plan_ids: &[String]) -> AppResult<usize> {
        if root_plan_ids.is_empty() {
            return Ok(0);
        }
        let ids = root_plan_ids.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction()?;
            let mut removed = 0;
            {
                let mut stmt = tx.prepare("DELETE FROM root_tasks WHERE root_plan_id = ?1")?;
                for id in &ids {
                    removed += stmt.execute(params![id])?;
                }
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> SqliteTaskStore {
        SqliteTaskStore::new(&Database::new_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_save_and_find_roundtrip() {
        let store = store();
        let mut task = RootTask::new("plan-1", DesiredTaskState::Start, Utc::now());
        task.task_result = Some("done".into());
        store.save(&task).await.unwrap();

        let loaded = store.find_by_id("plan-1").await.unwrap().unwrap();
        assert_eq!(loaded.desired_state, DesiredTaskState::Start);
        assert_eq!(loaded.start_time, task.start_time);
        assert_eq!(loaded.task_result.as_deref(), Some("done"));
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = store();
        let now = Utc::now();
        let mut task = RootTask::new("plan-1", DesiredTaskState::Start, now);
        store.save(&task).await.unwrap();
        task.apply_transition(DesiredTaskState::Pause, now + Duration::seconds(1));
        store.save(&task).await.unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].desired_state, DesiredTaskState::Pause);
        assert!(all[0].end_time.is_some());
    }

    #[tokio::test]
    async fn test_find_by_state() {
        let store = store();
        let now = Utc::now();
        store.save(&RootTask::new("a", DesiredTaskState::Start, now)).await.unwrap();
        store.save(&RootTask::new("b", DesiredTaskState::Stop, now)).await.unwrap();
        store.save(&RootTask::new("c", DesiredTaskState::Start, now)).await.unwrap();

        let started = store.find_by_state(DesiredTaskState::Start).await.unwrap();
        let mut ids: Vec<_> = started.into_iter().map(|t| t.root_plan_id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_find_ended_before() {
        let store = store();
        let now = Utc::now();
        let mut old = RootTask::new("old", DesiredTaskState::Start, now - Duration::days(3));
        old.apply_transition(DesiredTaskState::Stop, now - Duration::days(3));
        let mut just_before = RootTask::new("just_before", DesiredTaskState::Start, now);
        just_before.apply_transition(DesiredTaskState::Cancel, now - Duration::milliseconds(1));
        let mut after = RootTask::new("after", DesiredTaskState::Start, now);
        after.apply_transition(DesiredTaskState::Pause, now + Duration::seconds(1));
        for task in [&old, &just_before, &after] {
            store.save(task).await.unwrap();
        }
        store
            .save(&RootTask::new("running", DesiredTaskState::Start, now - Duration::days(5)))
            .await
            .unwrap();

        let ended = store.find_ended_before(now).await.unwrap();
        let ids: Vec<_> = ended.into_iter().map(|t| t.root_plan_id).collect();
        assert_eq!(ids, vec!["old", "just_before"]);
    }

    #[tokio::test]
    async fn test_delete_by_id_and_many() {
        let store = store();
        let now = Utc::now();
        for id in ["a", "b", "c"] {
            store.save(&RootTask::new(id, DesiredTaskState::Start, now)).await.unwrap();
        }
        assert!(store.delete_by_id("a").await.unwrap());
        assert!(!store.delete_by_id("a").await.unwrap());

        let removed = store
            .delete_many(&["b".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.find_all().await.unwrap().len(), 1);
        assert_eq!(store.delete_many(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("tasks.db");
        {
            let store = SqliteTaskStore::new(&Database::open(&path).unwrap());
            store
                .save(&RootTask::new("durable", DesiredTaskState::Cancel, Utc::now()))
                .await
                .unwrap();
        }
        let store = SqliteTaskStore::new(&Database::open(&path).unwrap());
        let task = store.find_by_id("durable").await.unwrap().unwrap();
        assert_eq!(task.desired_state, DesiredTaskState::Cancel);
    }
}
