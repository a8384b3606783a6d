//! Application configuration types
//!
//! Library crates own their config structs; this module only groups them
//! into the sections of `config/default.toml`.

use hive_core::OrchestratorConfig;
use hive_llm::{FineTuneConfig, HttpProviderConfig, PolicyConfig, Tier};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub planner: PlannerAppConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

/// Built-in planner/combiner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerAppConfig {
    /// Capability every prompt is routed to
    #[serde(default = "default_capability")]
    pub capability: String,
    /// Separator between subtask outputs in the final answer
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_capability() -> String {
    "general".to_string()
}

fn default_separator() -> String {
    "\n\n".to_string()
}

impl Default for PlannerAppConfig {
    fn default() -> Self {
        Self {
            capability: default_capability(),
            separator: default_separator(),
        }
    }
}

/// One optional provider per tier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub primary: Option<HttpProviderConfig>,
    #[serde(default)]
    pub secondary: Option<HttpProviderConfig>,
    #[serde(default)]
    pub tertiary: Option<HttpProviderConfig>,
}

impl ProvidersConfig {
    /// Configured providers in tier order
    pub fn tiers(&self) -> impl Iterator<Item = (Tier, &HttpProviderConfig)> {
        [
            (Tier::Primary, self.primary.as_ref()),
            (Tier::Secondary, self.secondary.as_ref()),
            (Tier::Tertiary, self.tertiary.as_ref()),
        ]
        .into_iter()
        .filter_map(|(tier, config)| config.map(|c| (tier, c)))
    }
}

/// Where tasks are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Data directory (defaults to ~/.hive)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// `~/.hive`, or `./.hive` when there is no home directory
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hive")
}

/// Periodic fine-tune export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_min_batch")]
    pub min_batch: usize,
    /// Where batches are written (defaults to `<data_dir>/training`)
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

fn default_interval_secs() -> u64 {
    FineTuneConfig::default().interval_secs
}

fn default_min_batch() -> usize {
    FineTuneConfig::default().min_batch
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
            min_batch: default_min_batch(),
            export_dir: None,
        }
    }
}

impl TrainingConfig {
    pub fn job_config(&self) -> FineTuneConfig {
        FineTuneConfig {
            interval_secs: self.interval_secs,
            min_batch: self.min_batch,
        }
    }
}

/// Task handler an agent is built with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    #[default]
    Generative,
    Noop,
}

/// One `[[agents]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub handler: HandlerKind,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Pin every request to one tier instead of automatic selection
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub history_limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config: AppConfig = toml_config(crate::runtime::loader::DEFAULT_CONFIG);

        assert_eq!(config.planner.capability, "general");
        assert_eq!(config.policy.primary_daily_cap, 100);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert!(!config.training.enabled);
        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.agents[0].handler, HandlerKind::Generative);

        let tiers: Vec<Tier> = config.providers.tiers().map(|(tier, _)| tier).collect();
        assert_eq!(tiers, vec![Tier::Primary, Tier::Tertiary]);
    }

    #[test]
    fn test_agent_entry_defaults() {
        let config: AppConfig = toml_config(
            r#"
            [[agents]]
            id = "reviewer"
            capabilities = ["review"]
            handler = "noop"
            tier = "secondary"
            "#,
        );

        let agent = &config.agents[0];
        assert_eq!(agent.handler, HandlerKind::Noop);
        assert_eq!(agent.tier, Some(Tier::Secondary));
        assert!(agent.system_prompt.is_none());
        assert_eq!(config.orchestrator.max_concurrent_subtasks, 4);
    }

    fn toml_config(raw: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
