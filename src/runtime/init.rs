//! Runtime assembly
//!
//! Builds the model policy, task store, orchestrator and configured agents,
//! and tears them down again.

use super::config::{AgentConfig, AppConfig, HandlerKind, StorageBackend};
use super::training::ExportFineTuner;
use anyhow::{Context, Result};
use hive_core::{
    AgentSpec, Directory, GenerativeTaskHandler, JoinCombiner, MemoryTaskStore, NoopTaskHandler,
    Orchestrator, SingleStepPlanner, SqliteTaskStore, TaskHandler, TaskStore,
};
use hive_llm::{FineTuneJob, GenerationProvider, HttpProvider, ModelPolicy, Tier};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A running Hive instance
pub struct Hive {
    pub orchestrator: Arc<Orchestrator>,
    pub policy: Arc<ModelPolicy>,
    training: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Hive {
    /// Start everything described by `config`, with HTTP providers.
    pub async fn start(config: AppConfig) -> Result<Self> {
        let mut providers: Vec<(Tier, Arc<dyn GenerationProvider>)> = Vec::new();
        for (tier, provider_config) in config.providers.tiers() {
            let provider = HttpProvider::new(provider_config.clone())
                .with_context(|| format!("Failed to create {} provider", tier))?;
            if !provider.is_configured() {
                warn!(
                    tier = %tier,
                    provider = %provider_config.name,
                    "Provider has no API key; requests for this tier will fall back"
                );
            }
            providers.push((tier, Arc::new(provider)));
        }
        Self::with_providers(config, providers).await
    }

    /// Start with caller-supplied providers.
    pub async fn with_providers(
        mut config: AppConfig,
        providers: Vec<(Tier, Arc<dyn GenerationProvider>)>,
    ) -> Result<Self> {
        let data_dir = config.storage.data_dir();
        info!(data_dir = %data_dir.display(), "Starting Hive");

        if config.storage.backend == StorageBackend::Sqlite {
            config
                .policy
                .quota_state_path
                .get_or_insert_with(|| data_dir.join("quota.json"));
            config
                .policy
                .learning_log_path
                .get_or_insert_with(|| data_dir.join("learning.jsonl"));
        }

        let mut builder = ModelPolicy::builder(config.policy.clone());
        for (tier, provider) in providers {
            builder = builder.provider(tier, provider);
        }
        let policy = Arc::new(builder.build().await.context("Failed to build model policy")?);

        let store = open_store(config.storage.backend, &data_dir).await?;
        let planner = Arc::new(SingleStepPlanner::new(config.planner.capability.clone()));
        let combiner = Arc::new(JoinCombiner::new(config.planner.separator.clone()));
        let orchestrator = Arc::new(
            Orchestrator::new(
                config.orchestrator.clone(),
                Arc::new(Directory::new()),
                planner,
                combiner,
            )
            .with_policy(policy.clone())
            .with_store(store),
        );

        for agent in &config.agents {
            let handler = task_handler(agent, &policy);
            orchestrator
                .spawn_agent(agent_spec(agent), handler)
                .await
                .with_context(|| format!("Failed to start agent '{}'", agent.id))?;
        }
        if config.agents.is_empty() {
            warn!("No agents configured; every subtask will be unassigned");
        }

        let training = start_training(&config, &data_dir, &policy);

        Ok(Self {
            orchestrator,
            policy,
            training,
        })
    }

    /// Stop training, agents and the policy.
    pub async fn shutdown(self) {
        if let Some((cancel, job)) = self.training {
            cancel.cancel();
            if let Err(e) = job.await {
                warn!(error = %e, "Fine-tune job ended abnormally");
            }
        }
        self.orchestrator.cleanup().await;
    }
}

async fn open_store(backend: StorageBackend, data_dir: &Path) -> Result<Arc<dyn TaskStore>> {
    match backend {
        StorageBackend::Sqlite => {
            let path = data_dir.join("hive.db");
            let store = SqliteTaskStore::new(&path)
                .await
                .context("Failed to initialize SQLite task store")?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryTaskStore::new())),
    }
}

/// Open the task store without starting agents (read-only commands).
pub async fn open_config_store(config: &AppConfig) -> Result<Arc<dyn TaskStore>> {
    open_store(config.storage.backend, &config.storage.data_dir()).await
}

fn agent_spec(agent: &AgentConfig) -> AgentSpec {
    let mut spec = agent
        .capabilities
        .iter()
        .fold(AgentSpec::new(agent.id.as_str()), |spec, cap| {
            spec.with_capability(cap.as_str())
        });
    if let Some(name) = &agent.name {
        spec = spec.with_name(name.as_str());
    }
    if let Some(limit) = agent.history_limit {
        spec = spec.with_history_limit(limit);
    }
    spec
}

fn task_handler(agent: &AgentConfig, policy: &Arc<ModelPolicy>) -> Arc<dyn TaskHandler> {
    match agent.handler {
        HandlerKind::Noop => Arc::new(NoopTaskHandler),
        HandlerKind::Generative => {
            let mut handler = GenerativeTaskHandler::new(policy.clone());
            if let Some(prompt) = &agent.system_prompt {
                handler = handler.with_system_prompt(prompt.as_str());
            }
            if let Some(tier) = agent.tier {
                handler = handler.with_tier(tier);
            }
            Arc::new(handler)
        }
    }
}

fn start_training(
    config: &AppConfig,
    data_dir: &Path,
    policy: &ModelPolicy,
) -> Option<(CancellationToken, JoinHandle<()>)> {
    if !config.training.enabled {
        return None;
    }
    let Some(log_path) = policy.learning_log().path() else {
        warn!("Training enabled but the learning log is disabled");
        return None;
    };

    let export_dir = config
        .training
        .export_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("training"));
    let job = Arc::new(FineTuneJob::new(
        log_path,
        Arc::new(ExportFineTuner::new(export_dir)),
        config.training.job_config(),
    ));
    let cancel = CancellationToken::new();
    let handle = job.spawn(cancel.clone());
    info!(interval_secs = config.training.interval_secs, "Fine-tune job started");
    Some((cancel, handle))
}
