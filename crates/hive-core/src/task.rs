//! Task model
//!
//! A [`Task`] is the persisted record of one top-level request. It is
//! created and mutated only by the orchestrator; its status moves strictly
//! forward:
//!
//! ```text
//! created ─▶ planning ─▶ executing ─▶ completed
//!    │          │            │
//!    └──────────┴────────────┴──────▶ failed
//! ```
//!
//! [`AgentTask`] and [`TaskOutcome`] are the unit of work placed on an
//! agent's queue and the result it reports back.

use crate::error::{Error, Result};
use crate::message::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Task
// ============================================================================

/// Top-level task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Recorded, nothing done yet
    Created,
    /// Waiting on the planner
    Planning,
    /// Subtasks are being dispatched
    Executing,
    /// Final answer available
    Completed,
    /// Gave up; see `error`
    Failed,
}

impl TaskStatus {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// No further transitions possible
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` is a legal forward step from `self`
    #[must_use]
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Planning)
                | (Self::Planning, Self::Executing)
                | (Self::Executing, Self::Completed)
                | (Self::Created | Self::Planning | Self::Executing, Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Kind of audit-trail entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Task recorded
    Created,
    /// Status changed
    Transition,
    /// Planning hint produced by the model policy
    Enriched,
    /// Plan accepted
    Planned,
    /// Subtask bound to an agent
    Assigned,
    /// No agent offers the capability
    Unassigned,
    /// Subtask will not run because a dependency did not complete
    Skipped,
    /// Subtask dispatched
    Dispatched,
    /// Subtask finished successfully
    SubtaskCompleted,
    /// Subtask finished with an error
    SubtaskFailed,
    /// Combiner produced the final answer
    Combined,
    /// Task failed
    Failed,
}

impl StepKind {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Transition => "transition",
            Self::Enriched => "enriched",
            Self::Planned => "planned",
            Self::Assigned => "assigned",
            Self::Unassigned => "unassigned",
            Self::Skipped => "skipped",
            Self::Dispatched => "dispatched",
            Self::SubtaskCompleted => "subtask_completed",
            Self::SubtaskFailed => "subtask_failed",
            Self::Combined => "combined",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One audit-trail entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// What happened
    pub kind: StepKind,
    /// Subtask concerned, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_id: Option<String>,
    /// Human-readable detail
    pub detail: String,
}

/// A planned unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskSpec {
    /// Id unique within the plan
    pub id: String,
    /// What the agent should do
    pub description: String,
    /// Capability an agent must offer to take it
    pub required_capability: String,
    /// Subtasks that must complete first
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl SubtaskSpec {
    /// Create a subtask with no dependencies
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        required_capability: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            required_capability: required_capability.into(),
            depends_on: Vec::new(),
        }
    }

    /// Add dependencies
    #[must_use]
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }
}

/// Subtask progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    /// Waiting for dependencies or a concurrency slot
    Pending,
    /// No agent offers the capability
    Unassigned,
    /// A dependency did not complete
    Skipped,
    /// Dispatched to its agent
    Running,
    /// Finished with output
    Completed,
    /// Finished with an error
    Failed,
}

impl SubtaskStatus {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Unassigned => "unassigned",
            Self::Skipped => "skipped",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Will not change again
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-subtask execution record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskRecord {
    /// Planned work
    pub spec: SubtaskSpec,
    /// Progress
    pub status: SubtaskStatus,
    /// Agent it was bound to
    #[serde(default)]
    pub assigned_agent: Option<AgentId>,
    /// Output on success
    #[serde(default)]
    pub output: Option<String>,
    /// Reason on failure or skip
    #[serde(default)]
    pub error: Option<String>,
    /// Round-trip time
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl SubtaskRecord {
    /// Fresh pending record
    #[must_use]
    pub fn pending(spec: SubtaskSpec) -> Self {
        Self {
            spec,
            status: SubtaskStatus::Pending,
            assigned_agent: None,
            output: None,
            error: None,
            duration_ms: None,
        }
    }
}

/// Persisted record of one top-level request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task id
    pub id: Uuid,
    /// Originating prompt
    pub prompt: String,
    /// Current status
    pub status: TaskStatus,
    /// Audit trail
    #[serde(default)]
    pub steps: Vec<TaskStep>,
    /// Subtasks in plan order
    #[serde(default)]
    pub subtasks: Vec<SubtaskRecord>,
    /// Subtask id to assigned agent
    #[serde(default)]
    pub agent_assignments: BTreeMap<String, AgentId>,
    /// Final answer, set once on success
    #[serde(default)]
    pub result: Option<String>,
    /// Failure reason, set once on failure
    #[serde(default)]
    pub error: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a task in `created` state
    pub fn new(prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut task = Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            status: TaskStatus::Created,
            steps: Vec::new(),
            subtasks: Vec::new(),
            agent_assignments: BTreeMap::new(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        task.push_step(StepKind::Created, None, "task created");
        task
    }

    /// Append an audit-trail entry
    pub fn push_step(
        &mut self,
        kind: StepKind,
        subtask_id: Option<&str>,
        detail: impl Into<String>,
    ) {
        let now = Utc::now();
        self.steps.push(TaskStep {
            timestamp: now,
            kind,
            subtask_id: subtask_id.map(str::to_string),
            detail: detail.into(),
        });
        self.updated_at = now;
    }

    /// Move forward to `next`, rejecting backward or skipping moves.
    pub fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "task {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        let detail = format!("{} -> {}", self.status, next);
        self.status = next;
        self.push_step(StepKind::Transition, None, detail);
        Ok(())
    }

    /// Finish successfully with `result`
    pub fn complete(&mut self, result: impl Into<String>) -> Result<()> {
        self.transition(TaskStatus::Completed)?;
        self.result = Some(result.into());
        self.push_step(StepKind::Combined, None, "final answer assembled");
        Ok(())
    }

    /// Finish with `error`
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(TaskStatus::Failed)?;
        let error = error.into();
        self.push_step(StepKind::Failed, None, error.clone());
        self.error = Some(error);
        Ok(())
    }

    /// Look up a subtask record
    #[must_use]
    pub fn subtask(&self, id: &str) -> Option<&SubtaskRecord> {
        self.subtasks.iter().find(|s| s.spec.id == id)
    }

    pub(crate) fn subtask_mut(&mut self, id: &str) -> Option<&mut SubtaskRecord> {
        self.subtasks.iter_mut().find(|s| s.spec.id == id)
    }

    /// Count subtasks in `status`
    #[must_use]
    pub fn count_subtasks(&self, status: SubtaskStatus) -> usize {
        self.subtasks.iter().filter(|s| s.status == status).count()
    }
}

// ============================================================================
// Agent queue items
// ============================================================================

/// Unit of work placed on an agent's task queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTask {
    /// Task id
    pub id: Uuid,
    /// What to do
    pub description: String,
    /// Capability this work needs
    #[serde(default)]
    pub required_capability: Option<String>,
    /// Structured input
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Outputs of completed dependencies keyed by subtask id
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Owning top-level task
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

impl AgentTask {
    /// Create a task with an empty payload and context
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            required_capability: None,
            payload: serde_json::Value::Null,
            context: BTreeMap::new(),
            parent_id: None,
        }
    }

    /// Set the required capability
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capability = Some(capability.into());
        self
    }

    /// Set the payload
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Add one dependency output
    #[must_use]
    pub fn with_context(mut self, subtask_id: impl Into<String>, output: impl Into<String>) -> Self {
        self.context.insert(subtask_id.into(), output.into());
        self
    }

    /// Set the owning task
    #[must_use]
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Reject tasks an agent cannot act on
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::Validation(format!(
                "task {} has an empty description",
                self.id
            )));
        }
        Ok(())
    }
}

/// Result an agent reports for an [`AgentTask`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Task id
    pub task_id: Uuid,
    /// Agent that ran it
    pub agent_id: AgentId,
    /// Whether the handler succeeded
    pub success: bool,
    /// Handler output
    #[serde(default)]
    pub output: Option<String>,
    /// Failure reason
    #[serde(default)]
    pub error: Option<String>,
    /// Handler run time
    pub duration_ms: u64,
}

impl TaskOutcome {
    /// Successful outcome
    pub fn succeeded(
        task_id: Uuid,
        agent_id: AgentId,
        output: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            task_id,
            agent_id,
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    /// Failed outcome
    pub fn failed(
        task_id: Uuid,
        agent_id: AgentId,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            task_id,
            agent_id,
            success: false,
            output: None,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests;
