use crate::message::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default number of completed tasks kept per agent
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Agent lifecycle state
///
/// ```text
/// IDLE ─▶ INITIALIZING ─▶ {IDLE, ERROR}
/// IDLE ─▶ RUNNING ⇄ WAITING
/// RUNNING | WAITING ─▶ {FINISHED, ERROR}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Built, not started
    Idle,
    /// Running the task handler's initialize hook
    Initializing,
    /// Handling a message or task
    Running,
    /// Started, both queues empty
    Waiting,
    /// Stopped cleanly
    Finished,
    /// Failed; will not process further input
    Error,
}

impl AgentState {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Finished => "finished",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique id
    pub id: AgentId,
    /// Display name (defaults to the id)
    #[serde(default)]
    pub name: Option<String>,
    /// Capabilities offered to the orchestrator
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Completed tasks kept in history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl AgentSpec {
    /// Spec with no capabilities
    pub fn new(id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            capabilities: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a capability
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Set the history bound
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Name to display
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// One completed task in an agent's bounded history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Task id
    pub task_id: Uuid,
    /// Task description
    pub description: String,
    /// Whether the handler succeeded
    pub success: bool,
    /// Handler run time
    pub duration_ms: u64,
    /// Completion time
    pub finished_at: DateTime<Utc>,
}

/// Point-in-time view of an agent
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    /// Agent id
    pub id: AgentId,
    /// Lifecycle state
    pub state: AgentState,
    /// Accepting input
    pub active: bool,
    /// Tasks waiting in the queue
    pub queued_tasks: usize,
    /// Messages waiting in the mailbox
    pub pending_messages: usize,
    /// Task being handled right now
    pub current_task: Option<Uuid>,
    /// Entries in the bounded history
    pub history_len: usize,
    /// Tasks handled since start
    pub completed_tasks: u64,
}

/// Persisted snapshot of an agent, saved on start and stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Agent id
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Capabilities
    pub capabilities: Vec<String>,
    /// Lifecycle state at save time
    pub state: AgentState,
    /// Tasks handled since start
    pub completed_tasks: u64,
    /// Save time
    pub updated_at: DateTime<Utc>,
}
