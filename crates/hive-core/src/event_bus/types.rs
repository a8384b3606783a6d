use crate::message::AgentId;
use crate::task::TaskStatus;
use serde::Serialize;
use uuid::Uuid;

/// Events emitted while tasks are planned and executed.
///
/// Events carry ids and short summaries only; full outputs are read from
/// the task store.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// Task recorded
    TaskCreated {
        /// Task id
        task_id: Uuid,
    },
    /// Task status changed
    TaskStatusChanged {
        /// Task id
        task_id: Uuid,
        /// New status
        status: TaskStatus,
    },
    /// Subtask bound to an agent
    SubtaskAssigned {
        /// Task id
        task_id: Uuid,
        /// Subtask id
        subtask_id: String,
        /// Assigned agent
        agent_id: AgentId,
    },
    /// Subtask will not run
    SubtaskSkipped {
        /// Task id
        task_id: Uuid,
        /// Subtask id
        subtask_id: String,
        /// Why
        reason: String,
    },
    /// Subtask dispatched to its agent
    SubtaskStarted {
        /// Task id
        task_id: Uuid,
        /// Subtask id
        subtask_id: String,
    },
    /// Subtask finished
    SubtaskFinished {
        /// Task id
        task_id: Uuid,
        /// Subtask id
        subtask_id: String,
        /// Whether it completed
        success: bool,
        /// Round-trip time
        duration_ms: u64,
    },
    /// Task completed
    TaskCompleted {
        /// Task id
        task_id: Uuid,
    },
    /// Task failed
    TaskFailed {
        /// Task id
        task_id: Uuid,
        /// Failure reason
        error: String,
    },
    /// Managed agent started
    AgentStarted {
        /// Agent id
        agent_id: AgentId,
    },
    /// Managed agent stopped
    AgentStopped {
        /// Agent id
        agent_id: AgentId,
    },
}

impl OrchestratorEvent {
    /// Task the event belongs to, if any.
    #[must_use]
    pub fn task_id(&self) -> Option<Uuid> {
        match self {
            Self::TaskCreated { task_id }
            | Self::TaskStatusChanged { task_id, .. }
            | Self::SubtaskAssigned { task_id, .. }
            | Self::SubtaskSkipped { task_id, .. }
            | Self::SubtaskStarted { task_id, .. }
            | Self::SubtaskFinished { task_id, .. }
            | Self::TaskCompleted { task_id }
            | Self::TaskFailed { task_id, .. } => Some(*task_id),
            Self::AgentStarted { .. } | Self::AgentStopped { .. } => None,
        }
    }
}
