//! Hive Core - Agent Runtime and Orchestration
//!
//! This crate provides the coordination layer for Hive:
//! - Agent: Per-agent mailbox and task queue with two consumption loops
//! - Directory: Registry of live agents, swarm membership and capability lookup
//! - Orchestrator: Plans a prompt into subtasks, dispatches them and combines results
//! - Task: Persisted task records with a monotonic status machine
//! - Store: Task and agent-record persistence (in-memory and SQLite)
//! - EventBus: Broadcast of orchestration lifecycle events

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod directory;
pub mod error;
pub mod event_bus;
pub mod message;
pub mod orchestrator;
pub mod planning;
pub mod store;
pub mod task;

pub use agent::{
    handler_fn, tool_fn, AgentContext, AgentHandle, AgentRecord, AgentRuntime, AgentSpec,
    AgentState, AgentStatus, GenerativeTaskHandler, HistoryEntry, MessageHandler,
    NoopTaskHandler, TaskHandler, Tool,
};
pub use directory::Directory;
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use event_bus::{EventBus, OrchestratorEvent};
pub use message::{AgentId, Message, MessageTarget, MessageType, SwarmId};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use planning::{Combiner, JoinCombiner, Plan, Planner, SingleStepPlanner, SubtaskResult};
pub use store::{MemoryTaskStore, SqliteTaskStore, TaskStore};
pub use task::{
    AgentTask, StepKind, SubtaskRecord, SubtaskSpec, SubtaskStatus, Task, TaskOutcome,
    TaskStatus, TaskStep,
};
