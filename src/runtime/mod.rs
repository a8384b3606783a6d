//! Runtime bootstrap
//!
//! Configuration loading and assembly of the policy, store, orchestrator
//! and agents used by the CLI commands.

pub mod config;
mod init;
mod loader;
mod training;

pub use init::{open_config_store, Hive};
pub use loader::load_config;
