//! Orchestrator - Task planning and dispatch
//!
//! Turns a prompt into a [`Task`](crate::task::Task), asks the planner for a
//! subtask graph, binds each subtask to an agent by capability, runs ready
//! subtasks concurrently and hands completed outputs to the combiner.
//!
//! # Module Structure
//!
//! - `config`: `OrchestratorConfig`
//! - `core`: `Orchestrator` struct, builder methods, agent management
//! - `process`: `submit` and the task status machine
//! - `execution`: assignment, skip propagation and concurrent dispatch

mod config;
mod core;
mod execution;
mod process;


pub use config::OrchestratorConfig;
pub use core::Orchestrator;
