//! EventBus - broadcast-based event system for orchestration lifecycle events.
//!
//! Publishes task, subtask and agent events so that observers (the CLI's
//! progress output, tests) can follow execution without polling the store.

/// Core event bus implementation (broadcast channel).
pub mod bus;
/// Event type definitions.
pub mod types;

pub use bus::EventBus;
pub use types::OrchestratorEvent;
