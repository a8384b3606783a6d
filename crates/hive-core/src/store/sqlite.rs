//! SQLite task store
//!
//! Tasks and agent records are stored as JSON documents alongside a few
//! indexed columns.
//!
//! # Usage
//!
//! ```no_run
//! use hive_core::store::SqliteTaskStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Default location: ~/.hive/hive.db
//! let store = SqliteTaskStore::new_default().await?;
//!
//! // Or specify a custom path
//! let store = SqliteTaskStore::new("/path/to/hive.db").await?;
//! # Ok(())
//! # }
//! ```

use super::TaskStore;
use crate::agent::AgentRecord;
use crate::error::{Error, Result};
use crate::message::AgentId;
use crate::task::Task;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// SQLite-backed [`TaskStore`]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path`
    ///
    /// # Errors
    ///
    /// Returns error if database creation or schema setup fails.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Persistence(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Persistence(format!("Invalid SQLite path: {}", e)))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to connect to SQLite: {}", e)))?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(path = %path.display(), "SQLite task store initialized");
        Ok(store)
    }

    /// Open the store at the default location (~/.hive/hive.db)
    pub async fn new_default() -> Result<Self> {
        let path = Self::default_path()?;
        Self::new(&path).await
    }

    /// Default database path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Persistence("Could not determine home directory".to_string()))?;
        Ok(home.join(".hive").join("hive.db"))
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                task_data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to create tasks table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to create index: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_records (
                agent_id TEXT PRIMARY KEY,
                record_data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to create agent_records table: {}", e)))?;

        debug!("SQLite task schema initialized");
        Ok(())
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn save_task(&self, task: &Task) -> Result<()> {
        let data = serde_json::to_string(task)
            .map_err(|e| Error::Persistence(format!("Failed to serialize task: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO tasks (id, status, task_data, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                task_data = excluded.task_data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(task.id.to_string())
        .bind(task.status.as_str())
        .bind(&data)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to save task: {}", e)))?;

        debug!(task_id = %task.id, status = %task.status, "Task saved to SQLite");
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT task_data FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to get task: {}", e)))?;

        row.map(|(data,)| {
            serde_json::from_str(&data)
                .map_err(|e| Error::Persistence(format!("Failed to deserialize task: {}", e)))
        })
        .transpose()
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT task_data FROM tasks ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::Persistence(format!("Failed to list tasks: {}", e)))?;

        rows.into_iter()
            .map(|(data,)| {
                serde_json::from_str(&data)
                    .map_err(|e| Error::Persistence(format!("Failed to deserialize task: {}", e)))
            })
            .collect()
    }

    async fn save_agent_record(&self, record: &AgentRecord) -> Result<()> {
        let data = serde_json::to_string(record)
            .map_err(|e| Error::Persistence(format!("Failed to serialize agent record: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO agent_records (agent_id, record_data, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(agent_id) DO UPDATE SET
                record_data = excluded.record_data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.id.as_str())
        .bind(&data)
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to save agent record: {}", e)))?;

        debug!(agent_id = %record.id, state = %record.state, "Agent record saved to SQLite");
        Ok(())
    }

    async fn get_agent_record(&self, id: &AgentId) -> Result<Option<AgentRecord>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT record_data FROM agent_records WHERE agent_id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Persistence(format!("Failed to get agent record: {}", e)))?;

        row.map(|(data,)| {
            serde_json::from_str(&data).map_err(|e| {
                Error::Persistence(format!("Failed to deserialize agent record: {}", e))
            })
        })
        .transpose()
    }
}
