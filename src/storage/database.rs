//! SQLite Database
//!
//! Embedded database for persistent storage using rusqlite with r2d2 connection pooling.

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{database_path, ensure_dir};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database service owning the connection pool
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a database from an existing connection pool.
    pub fn from_pool(pool: DbPool) -> AppResult<Self> {
        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// The pool holds a single connection so every caller sees the same
    /// in-memory database.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        Self::from_pool(pool)
    }

    /// Open (or create) a database file.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }

        // Several workers may share one file.
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.busy_timeout(Duration::from_secs(5)));
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        Self::from_pool(pool)
    }

    /// Open the database at the default location.
    pub fn new() -> AppResult<Self> {
        Self::open(&database_path()?)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS root_tasks (
                root_plan_id TEXT PRIMARY KEY,
                desired_state TEXT NOT NULL,
                start_time TEXT,
                end_time TEXT,
                last_updated TEXT NOT NULL,
                task_result TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_root_tasks_state ON root_tasks(desired_state)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_root_tasks_end_time ON root_tasks(end_time)",
            [],
        )?;

        Ok(())
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        self.pool
            .get()
            .map(|conn| conn.execute_batch("SELECT 1").is_ok())
            .unwrap_or(false)
    }
}
