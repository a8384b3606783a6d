//! Orchestrator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Subtasks allowed in flight at once
    #[serde(default = "default_max_concurrent_subtasks")]
    pub max_concurrent_subtasks: usize,
    /// Per-subtask round-trip limit in seconds (0 = no limit)
    #[serde(default)]
    pub subtask_timeout_secs: u64,
    /// Ask the model policy for planning notes before calling the planner
    #[serde(default)]
    pub enrich_planning: bool,
    /// System prompt used for planning enrichment
    #[serde(default = "default_planning_system_prompt")]
    pub planning_system_prompt: String,
    /// Event bus buffer size
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_max_concurrent_subtasks() -> usize {
    4
}

fn default_planning_system_prompt() -> String {
    "Outline the steps needed to fulfil the request. Be brief.".to_string()
}

fn default_event_capacity() -> usize {
    256
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_subtasks: default_max_concurrent_subtasks(),
            subtask_timeout_secs: 0,
            enrich_planning: false,
            planning_system_prompt: default_planning_system_prompt(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl OrchestratorConfig {
    /// Set the concurrency bound
    #[must_use]
    pub fn with_max_concurrent_subtasks(mut self, max: usize) -> Self {
        self.max_concurrent_subtasks = max;
        self
    }

    /// Set the per-subtask timeout
    #[must_use]
    pub fn with_subtask_timeout_secs(mut self, secs: u64) -> Self {
        self.subtask_timeout_secs = secs;
        self
    }

    /// Enable planning enrichment
    #[must_use]
    pub fn with_enrich_planning(mut self, enabled: bool) -> Self {
        self.enrich_planning = enabled;
        self
    }

    /// Timeout as a `Duration`, if any
    #[must_use]
    pub fn subtask_timeout(&self) -> Option<Duration> {
        (self.subtask_timeout_secs > 0).then(|| Duration::from_secs(self.subtask_timeout_secs))
    }
}
