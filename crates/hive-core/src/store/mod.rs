//! Task and agent-record persistence
//!
//! - `MemoryTaskStore`: process-local maps, for tests and ephemeral runs
//! - `SqliteTaskStore`: JSON documents in an embedded SQLite database

mod memory;
mod sqlite;

pub use memory::MemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use crate::agent::AgentRecord;
use crate::error::Result;
use crate::message::AgentId;
use crate::task::Task;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence interface used by the orchestrator and agent runtimes
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert or replace a task
    async fn save_task(&self, task: &Task) -> Result<()>;

    /// Load a task by id
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>>;

    /// All tasks, newest first
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Insert or replace an agent record
    async fn save_agent_record(&self, record: &AgentRecord) -> Result<()>;

    /// Load an agent record by id
    async fn get_agent_record(&self, id: &AgentId) -> Result<Option<AgentRecord>>;
}
