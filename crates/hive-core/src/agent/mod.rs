//! Agent Runtime
//!
//! Every agent owns a mailbox and a task queue, each drained by its own
//! cooperative loop:
//!
//! ```text
//!   receive(msg) ──▶ mailbox ──▶ mailbox loop ──▶ MessageHandler[msg.type]
//!   submit_task  ──▶ task queue ──▶ task loop ──▶ TaskHandler ──▶ history
//!   dispatch     ──┘                                        └──▶ oneshot(TaskOutcome)
//! ```
//!
//! Specialization lives in the [`TaskHandler`] strategy, so there is a
//! single runtime type for every kind of agent. Per-item failures (invalid
//! input, missing handler, handler error or panic) are logged and never
//! stop a loop.

mod context;
mod handle;
mod handler;
mod runtime;
mod types;

pub use context::AgentContext;
pub use handle::AgentHandle;
pub use handler::{
    handler_fn, tool_fn, GenerativeTaskHandler, MessageHandler, NoopTaskHandler, TaskHandler, Tool,
};
pub use runtime::AgentRuntime;
pub use types::{
    AgentRecord, AgentSpec, AgentState, AgentStatus, HistoryEntry, DEFAULT_HISTORY_LIMIT,
};

pub(crate) use handle::AgentShared;
#[cfg(test)]
pub(crate) use handle::QueueReceivers;
