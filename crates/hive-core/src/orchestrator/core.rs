//! Orchestrator core structure
//!
//! Contains the main `Orchestrator` struct, its builder methods and the
//! management of agents it spawned.

use crate::agent::{AgentHandle, AgentRuntime, AgentSpec, TaskHandler};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::event_bus::{EventBus, OrchestratorEvent};
use crate::planning::{Combiner, Planner};
use crate::store::{MemoryTaskStore, TaskStore};
use crate::task::Task;
use hive_llm::ModelPolicy;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::config::OrchestratorConfig;

/// Coordinates planning, assignment and execution of tasks
pub struct Orchestrator {
    pub(crate) config: OrchestratorConfig,
    pub(crate) directory: Arc<Directory>,
    pub(crate) planner: Arc<dyn Planner>,
    pub(crate) combiner: Arc<dyn Combiner>,
    pub(crate) policy: Option<Arc<ModelPolicy>>,
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) agents: Mutex<Vec<Arc<AgentRuntime>>>,
}

impl Orchestrator {
    /// Create an orchestrator with an in-memory store and no model policy
    #[must_use]
    pub fn new(
        config: OrchestratorConfig,
        directory: Arc<Directory>,
        planner: Arc<dyn Planner>,
        combiner: Arc<dyn Combiner>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_capacity));
        Self {
            config,
            directory,
            planner,
            combiner,
            policy: None,
            store: Arc::new(MemoryTaskStore::new()),
            event_bus,
            agents: Mutex::new(Vec::new()),
        }
    }

    /// Use a model policy for planning enrichment and shut it down on cleanup
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<ModelPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Persist tasks and agent records in `store`
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = store;
        self
    }

    /// Publish on a shared event bus
    #[must_use]
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Shared directory
    #[must_use]
    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    /// Lifecycle event bus
    #[must_use]
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Model policy, if configured
    #[must_use]
    pub fn policy(&self) -> Option<&Arc<ModelPolicy>> {
        self.policy.as_ref()
    }

    /// Task store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Load a task by id
    pub async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        self.store.get_task(id).await
    }

    /// All tasks, newest first
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.store.list_tasks().await
    }

    /// Build, initialize and start an agent that this orchestrator manages.
    pub async fn spawn_agent(
        &self,
        spec: AgentSpec,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<Arc<AgentRuntime>> {
        if self.directory.lookup(&spec.id).is_ok() {
            return Err(Error::Validation(format!(
                "agent '{}' is already registered",
                spec.id
            )));
        }

        let runtime = Arc::new(
            AgentRuntime::new(spec, self.directory.clone(), handler).with_store(self.store.clone()),
        );
        runtime.initialize().await?;
        runtime.start().await?;

        self.agents.lock().await.push(runtime.clone());
        self.emit(OrchestratorEvent::AgentStarted {
            agent_id: runtime.id().clone(),
        });
        Ok(runtime)
    }

    /// Handles of the agents this orchestrator manages
    pub async fn agents(&self) -> Vec<AgentHandle> {
        self.agents
            .lock()
            .await
            .iter()
            .map(|runtime| runtime.handle())
            .collect()
    }

    /// Stop managed agents, shut down the model policy and clear the
    /// directory. Failures are logged; every step is attempted.
    pub async fn cleanup(&self) {
        let agents = std::mem::take(&mut *self.agents.lock().await);
        let count = agents.len();
        for runtime in agents {
            if let Err(e) = runtime.stop().await {
                warn!(agent_id = %runtime.id(), error = %e, "Failed to stop agent cleanly");
            }
            self.emit(OrchestratorEvent::AgentStopped {
                agent_id: runtime.id().clone(),
            });
        }

        if let Some(policy) = &self.policy {
            policy.shutdown().await;
        }

        self.directory.clear();
        info!(agents = count, "Orchestrator cleanup complete");
    }

    pub(crate) fn emit(&self, event: OrchestratorEvent) {
        self.event_bus.publish(event);
    }

    pub(crate) async fn persist(&self, task: &Task) -> Result<()> {
        self.store.save_task(task).await
    }

    /// Save mid-execution progress; failures are logged and the next save
    /// carries the same state.
    pub(crate) async fn persist_progress(&self, task: &Task) {
        if let Err(e) = self.store.save_task(task).await {
            warn!(task_id = %task.id, error = %e, "Failed to persist task progress");
        }
    }
}
