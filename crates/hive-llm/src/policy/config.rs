//! Model policy configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Automatic primary selections allowed per UTC day (0 = unlimited)
    #[serde(default = "default_primary_daily_cap")]
    pub primary_daily_cap: u64,
    /// Where the quota counter is persisted (in-memory when unset)
    #[serde(default)]
    pub quota_state_path: Option<PathBuf>,
    /// Response cache TTL in seconds (0 disables caching)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Maximum cached responses
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    /// JSONL file receiving learning examples (disabled when unset)
    #[serde(default)]
    pub learning_log_path: Option<PathBuf>,
}

fn default_primary_daily_cap() -> u64 {
    100
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    1000
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            primary_daily_cap: default_primary_daily_cap(),
            quota_state_path: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            learning_log_path: None,
        }
    }
}
