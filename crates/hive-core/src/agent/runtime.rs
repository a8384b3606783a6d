use super::context::AgentContext;
use super::handle::{AgentHandle, AgentShared, QueueReceivers, QueuedTask};
use super::handler::{MessageHandler, TaskHandler, Tool};
use super::types::{AgentSpec, AgentState, HistoryEntry};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::message::{AgentId, Message, MessageType};
use crate::store::TaskStore;
use crate::task::{AgentTask, TaskOutcome};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Owns one agent: its queues, its loops and its lifecycle.
pub struct AgentRuntime {
    handle: AgentHandle,
    context: AgentContext,
    directory: Arc<Directory>,
    task_handler: Arc<dyn TaskHandler>,
    receivers: Mutex<Option<QueueReceivers>>,
    cancel: CancellationToken,
    loops: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    store: Option<Arc<dyn TaskStore>>,
}

impl AgentRuntime {
    /// Build an idle agent. Nothing runs until [`start`](Self::start).
    pub fn new(
        spec: AgentSpec,
        directory: Arc<Directory>,
        task_handler: Arc<dyn TaskHandler>,
    ) -> Self {
        let (shared, receivers) = AgentShared::new(&spec);
        let handle = AgentHandle::from_shared(shared);
        let cancel = CancellationToken::new();
        let context = AgentContext::new(handle.clone(), directory.clone(), cancel.clone());

        Self {
            handle,
            context,
            directory,
            task_handler,
            receivers: Mutex::new(Some(receivers)),
            cancel,
            loops: tokio::sync::Mutex::new(Vec::new()),
            store: None,
        }
    }

    /// Save an [`AgentRecord`](super::AgentRecord) on start and stop
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Agent id
    #[must_use]
    pub fn id(&self) -> &AgentId {
        self.handle.id()
    }

    /// A new handle to this agent
    #[must_use]
    pub fn handle(&self) -> AgentHandle {
        self.handle.clone()
    }

    /// Context handed to this agent's handlers
    #[must_use]
    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> AgentState {
        self.handle.state()
    }

    /// Route messages of `message_type` to `handler`
    pub fn register_handler(&self, message_type: MessageType, handler: Arc<dyn MessageHandler>) {
        self.handle.shared().register_handler(message_type, handler);
    }

    /// Register a tool under `name`, replacing any previous one
    pub fn register_tool(&self, name: impl Into<String>, tool: Arc<dyn Tool>) {
        self.handle.shared().register_tool(name.into(), tool);
    }

    /// Invoke a registered tool
    pub async fn use_tool(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        self.context.use_tool(name, args).await
    }

    /// Run the task handler's setup hook.
    #[instrument(skip(self), fields(agent_id = %self.id()))]
    pub async fn initialize(&self) -> Result<()> {
        let shared = self.handle.shared();
        shared
            .transition(AgentState::Idle, AgentState::Initializing)
            .map_err(|state| {
                Error::InvalidState(format!(
                    "cannot initialize agent {} in state {}",
                    self.id(),
                    state
                ))
            })?;

        match self.task_handler.initialize(&self.context).await {
            Ok(()) => {
                shared.set_state(AgentState::Idle);
                debug!(handler = self.task_handler.name(), "Agent initialized");
                Ok(())
            }
            Err(e) => {
                shared.set_state(AgentState::Error);
                error!(handler = self.task_handler.name(), error = %e, "Agent initialization failed");
                Err(e)
            }
        }
    }

    /// Register in the directory and start both consumption loops.
    ///
    /// Starting an already-active agent is a no-op.
    pub async fn start(&self) -> Result<()> {
        let shared = self.handle.shared();
        if shared.is_active() {
            warn!(agent_id = %self.id(), "Agent already started");
            return Ok(());
        }

        shared
            .transition(AgentState::Idle, AgentState::Running)
            .map_err(|state| {
                Error::InvalidState(format!("cannot start agent {} in state {}", self.id(), state))
            })?;

        let receivers = self
            .receivers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| {
                Error::InvalidState(format!("agent {} queues already consumed", self.id()))
            })?;

        shared.set_active(true);
        self.directory.register(&self.handle);

        let mailbox = tokio::spawn(run_mailbox(
            self.context.clone(),
            receivers.mailbox,
            self.cancel.clone(),
        ));
        let tasks = tokio::spawn(run_tasks(
            self.context.clone(),
            self.task_handler.clone(),
            receivers.tasks,
            self.cancel.clone(),
        ));
        self.loops.lock().await.extend([mailbox, tasks]);
        shared.settle();

        info!(
            agent_id = %self.id(),
            handler = self.task_handler.name(),
            capabilities = ?self.handle.capabilities(),
            "Agent started"
        );
        self.save_record().await;
        Ok(())
    }

    /// Deregister, signal both loops and wait for their current item.
    pub async fn stop(&self) -> Result<()> {
        let shared = self.handle.shared();
        shared.set_active(false);
        self.directory.deregister_handle(&self.handle);
        self.cancel.cancel();

        let loops = std::mem::take(&mut *self.loops.lock().await);
        let mut join_error = None;
        for handle in loops {
            if let Err(e) = handle.await {
                error!(agent_id = %self.id(), error = %e, "Agent loop ended abnormally");
                join_error = Some(e);
            }
        }

        if shared.state() != AgentState::Error {
            shared.set_state(AgentState::Finished);
        }
        info!(agent_id = %self.id(), state = %shared.state(), "Agent stopped");
        self.save_record().await;

        match join_error {
            Some(e) => Err(Error::Internal(format!("agent loop failed: {}", e))),
            None => Ok(()),
        }
    }

    async fn save_record(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save_agent_record(&self.handle.record()).await {
            warn!(agent_id = %self.id(), error = %e, "Failed to save agent record");
        }
    }
}

impl Drop for AgentRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ============================================================================
// Consumption loops
// ============================================================================

async fn run_mailbox(
    ctx: AgentContext,
    mut rx: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    let shared = ctx.handle().shared().clone();
    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            message = rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        shared.message_dequeued();
        shared.begin_work();
        handle_message(&ctx, &shared, message).await;
        shared.end_work();
    }
    debug!(agent_id = %shared.id(), "Mailbox loop stopped");
}

async fn handle_message(ctx: &AgentContext, shared: &AgentShared, message: Message) {
    let message_id = message.id();
    if let Err(e) = message.validate() {
        warn!(agent_id = %shared.id(), message_id = %message_id, error = %e, "Dropping invalid message");
        return;
    }

    let Some(handler) = shared.handler_for(message.message_type()) else {
        let e = Error::HandlerNotFound(message.message_type().to_string());
        warn!(agent_id = %shared.id(), message_id = %message_id, error = %e, "Dropping message");
        return;
    };

    match AssertUnwindSafe(handler.handle(ctx, message)).catch_unwind().await {
        Ok(Ok(())) => debug!(agent_id = %shared.id(), message_id = %message_id, "Message handled"),
        Ok(Err(e)) => {
            warn!(agent_id = %shared.id(), message_id = %message_id, error = %e, "Message handler failed")
        }
        Err(_) => {
            error!(agent_id = %shared.id(), message_id = %message_id, "Message handler panicked")
        }
    }
}

async fn run_tasks(
    ctx: AgentContext,
    handler: Arc<dyn TaskHandler>,
    mut rx: mpsc::UnboundedReceiver<QueuedTask>,
    cancel: CancellationToken,
) {
    let shared = ctx.handle().shared().clone();
    loop {
        let queued = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            queued = rx.recv() => match queued {
                Some(queued) => queued,
                None => break,
            },
        };

        shared.task_dequeued();
        shared.begin_work();
        let outcome = execute_task(&ctx, &shared, handler.as_ref(), queued.task).await;
        shared.end_work();

        if let Some(reply) = queued.reply {
            if reply.send(outcome).is_err() {
                debug!(agent_id = %shared.id(), "Outcome receiver dropped");
            }
        }
    }
    debug!(agent_id = %shared.id(), "Task loop stopped");
}

async fn execute_task(
    ctx: &AgentContext,
    shared: &AgentShared,
    handler: &dyn TaskHandler,
    task: AgentTask,
) -> TaskOutcome {
    let agent_id = shared.id().clone();
    if let Err(e) = task.validate() {
        warn!(agent_id = %agent_id, task_id = %task.id, error = %e, "Rejecting invalid task");
        return TaskOutcome::failed(task.id, agent_id, e.to_string(), 0);
    }

    shared.set_current_task(Some(task.id));
    let start = Instant::now();
    let result = AssertUnwindSafe(handler.handle_task(ctx, &task))
        .catch_unwind()
        .await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(Ok(output)) => {
            debug!(agent_id = %agent_id, task_id = %task.id, duration_ms, "Task completed");
            TaskOutcome::succeeded(task.id, agent_id, output, duration_ms)
        }
        Ok(Err(e)) => {
            warn!(agent_id = %agent_id, task_id = %task.id, error = %e, "Task failed");
            TaskOutcome::failed(task.id, agent_id, e.to_string(), duration_ms)
        }
        Err(_) => {
            error!(agent_id = %agent_id, task_id = %task.id, "Task handler panicked");
            TaskOutcome::failed(task.id, agent_id, "task handler panicked", duration_ms)
        }
    };

    shared.push_history(HistoryEntry {
        task_id: task.id,
        description: task.description.clone(),
        success: outcome.success,
        duration_ms,
        finished_at: Utc::now(),
    });
    shared.set_current_task(None);
    outcome
}
