//! Interruption Store Integration Tests
//!
//! Two coordinators opened on the same database file stand in for two
//! stateless workers.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use plan_relay::services::interruption::InterruptionCoordinator;
use plan_relay::storage::{Database, SqliteTaskStore, TaskStore};
use plan_relay::{DesiredTaskState, RootTask};

fn worker(dir: &TempDir) -> (InterruptionCoordinator, Arc<SqliteTaskStore>) {
    let db = Database::open(&dir.path().join("tasks.db")).unwrap();
    let store = Arc::new(SqliteTaskStore::new(&db));
    (InterruptionCoordinator::new(store.clone()), store)
}

// ============================================================================
// Cross-worker visibility
// ============================================================================

#[tokio::test]
async fn test_pause_from_one_worker_seen_by_another() {
    let dir = TempDir::new().unwrap();
    let (ui, _) = worker(&dir);
    let (executor, _) = worker(&dir);

    ui.create_or_update_task("root-1", DesiredTaskState::Start)
        .await
        .unwrap();
    assert!(executor.is_running("root-1").await);
    assert!(executor.check_and_throw_if_interrupted("root-1").await.is_ok());

    assert!(ui.pause_task("root-1").await);
    assert!(executor.should_interrupt("root-1").await);
    let err = executor
        .check_and_throw_if_interrupted("root-1")
        .await
        .unwrap_err();
    assert!(err.is_interrupted());

    assert!(ui.resume_task("root-1").await);
    let task = executor.get_task("root-1").await.unwrap();
    assert_eq!(task.desired_state, DesiredTaskState::Resume);
    assert!(task.end_time.is_none());
    assert!(task.start_time.is_some());
}

#[tokio::test]
async fn test_last_write_wins() {
    let dir = TempDir::new().unwrap();
    let (a, _) = worker(&dir);
    let (b, _) = worker(&dir);

    a.create_or_update_task("root", DesiredTaskState::Start)
        .await
        .unwrap();
    a.cancel_task("root").await;
    b.resume_task("root").await;

    assert_eq!(a.get_status("root").await, Some(DesiredTaskState::Resume));
    assert!(a.is_running("root").await);
}

// ============================================================================
// Observability and retention
// ============================================================================

#[tokio::test]
async fn test_running_listing_and_sweep() {
    let dir = TempDir::new().unwrap();
    let (coordinator, store) = worker(&dir);

    for id in ["a", "b", "c"] {
        coordinator
            .create_or_update_task(id, DesiredTaskState::Start)
            .await
            .unwrap();
    }
    coordinator.stop_task("c").await;

    let long_ago = Utc::now() - Duration::days(45);
    let mut stale = RootTask::new("stale", DesiredTaskState::Start, long_ago);
    stale.apply_transition(DesiredTaskState::Stop, long_ago);
    store.save(&stale).await.unwrap();

    let mut running = coordinator.list_running_plan_ids().await;
    running.sort();
    assert_eq!(running, vec!["a", "b"]);
    assert_eq!(coordinator.count_running().await, 2);

    assert_eq!(coordinator.sweep_completed(30).await.unwrap(), 1);
    assert!(!coordinator.task_exists("stale").await);
    // Recently stopped rows survive the sweep.
    assert!(coordinator.task_exists("c").await);
}

#[tokio::test]
async fn test_rows_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let (coordinator, _) = worker(&dir);
        coordinator
            .create_or_update_task("durable", DesiredTaskState::Start)
            .await
            .unwrap();
        coordinator
            .update_task_result("durable", "finished report")
            .await
            .unwrap();
    }

    let (reopened, _) = worker(&dir);
    let task = reopened.get_task("durable").await.unwrap();
    assert_eq!(task.task_result.as_deref(), Some("finished report"));
}
