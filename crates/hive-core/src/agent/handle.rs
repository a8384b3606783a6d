use super::handler::{MessageHandler, Tool};
use super::types::{AgentRecord, AgentSpec, AgentState, AgentStatus, HistoryEntry};
use crate::error::{Error, Result};
use crate::message::{AgentId, Message, MessageType};
use crate::task::{AgentTask, TaskOutcome};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;
use uuid::Uuid;

/// A task plus the optional channel its outcome is correlated on
pub(crate) struct QueuedTask {
    pub(crate) task: AgentTask,
    pub(crate) reply: Option<oneshot::Sender<TaskOutcome>>,
}

pub(crate) struct QueueReceivers {
    pub(crate) mailbox: mpsc::UnboundedReceiver<Message>,
    pub(crate) tasks: mpsc::UnboundedReceiver<QueuedTask>,
}

struct Lifecycle {
    state: AgentState,
    /// Loops currently handling an item
    busy: usize,
}

/// State shared by an agent's runtime, its loops and every handle.
pub(crate) struct AgentShared {
    id: AgentId,
    name: String,
    capabilities: BTreeSet<String>,
    history_limit: usize,
    lifecycle: Mutex<Lifecycle>,
    active: AtomicBool,
    mailbox_tx: mpsc::UnboundedSender<Message>,
    task_tx: mpsc::UnboundedSender<QueuedTask>,
    pending_messages: AtomicUsize,
    queued_tasks: AtomicUsize,
    current_task: Mutex<Option<Uuid>>,
    history: Mutex<VecDeque<HistoryEntry>>,
    completed_tasks: AtomicU64,
    handlers: RwLock<HashMap<MessageType, Arc<dyn MessageHandler>>>,
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl AgentShared {
    pub(crate) fn new(spec: &AgentSpec) -> (Arc<Self>, QueueReceivers) {
        let (mailbox_tx, mailbox) = mpsc::unbounded_channel();
        let (task_tx, tasks) = mpsc::unbounded_channel();
        let shared = Arc::new(Self {
            id: spec.id.clone(),
            name: spec.display_name(),
            capabilities: spec.capabilities.iter().cloned().collect(),
            history_limit: spec.history_limit,
            lifecycle: Mutex::new(Lifecycle {
                state: AgentState::Idle,
                busy: 0,
            }),
            active: AtomicBool::new(false),
            mailbox_tx,
            task_tx,
            pending_messages: AtomicUsize::new(0),
            queued_tasks: AtomicUsize::new(0),
            current_task: Mutex::new(None),
            history: Mutex::new(VecDeque::new()),
            completed_tasks: AtomicU64::new(0),
            handlers: RwLock::new(HashMap::new()),
            tools: RwLock::new(HashMap::new()),
        });
        (shared, QueueReceivers { mailbox, tasks })
    }

    pub(crate) fn id(&self) -> &AgentId {
        &self.id
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub(crate) fn state(&self) -> AgentState {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    pub(crate) fn set_state(&self, state: AgentState) {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner()).state = state;
    }

    /// Swap `from` for `to`; returns the actual state on mismatch.
    pub(crate) fn transition(&self, from: AgentState, to: AgentState) -> std::result::Result<(), AgentState> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if lifecycle.state != from {
            return Err(lifecycle.state);
        }
        lifecycle.state = to;
        Ok(())
    }

    /// Enter `Waiting` once started, unless a loop already picked up work.
    pub(crate) fn settle(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if lifecycle.busy == 0 && lifecycle.state == AgentState::Running {
            lifecycle.state = AgentState::Waiting;
        }
    }

    pub(crate) fn begin_work(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        lifecycle.busy += 1;
        if lifecycle.state == AgentState::Waiting {
            lifecycle.state = AgentState::Running;
        }
    }

    pub(crate) fn end_work(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        lifecycle.busy = lifecycle.busy.saturating_sub(1);
        if lifecycle.busy == 0 && lifecycle.state == AgentState::Running {
            lifecycle.state = AgentState::Waiting;
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn set_active(&self, active: bool) -> bool {
        self.active.swap(active, Ordering::SeqCst)
    }

    // ========================================================================
    // Queues
    // ========================================================================

    fn ensure_active(&self, what: &str) -> Result<()> {
        if self.is_active() {
            return Ok(());
        }
        warn!(agent_id = %self.id, "Rejected {} for inactive agent", what);
        Err(Error::AgentInactive(self.id.to_string()))
    }

    fn enqueue_message(&self, message: Message) -> Result<()> {
        self.ensure_active("message")?;
        self.pending_messages.fetch_add(1, Ordering::SeqCst);
        if self.mailbox_tx.send(message).is_err() {
            self.pending_messages.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::AgentInactive(self.id.to_string()));
        }
        Ok(())
    }

    fn enqueue_task(&self, queued: QueuedTask) -> Result<()> {
        self.ensure_active("task")?;
        self.queued_tasks.fetch_add(1, Ordering::SeqCst);
        if self.task_tx.send(queued).is_err() {
            self.queued_tasks.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::AgentInactive(self.id.to_string()));
        }
        Ok(())
    }

    pub(crate) fn message_dequeued(&self) {
        self.pending_messages.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn task_dequeued(&self) {
        self.queued_tasks.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn set_current_task(&self, task_id: Option<Uuid>) {
        *self.current_task.lock().unwrap_or_else(|e| e.into_inner()) = task_id;
    }

    pub(crate) fn push_history(&self, entry: HistoryEntry) {
        if entry.success {
            self.completed_tasks.fetch_add(1, Ordering::SeqCst);
        }
        if self.history_limit == 0 {
            return;
        }
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        while history.len() >= self.history_limit {
            history.pop_front();
        }
        history.push_back(entry);
    }

    // ========================================================================
    // Registries
    // ========================================================================

    pub(crate) fn register_handler(&self, message_type: MessageType, handler: Arc<dyn MessageHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(message_type, handler);
    }

    pub(crate) fn handler_for(&self, message_type: &MessageType) -> Option<Arc<dyn MessageHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(message_type)
            .cloned()
    }

    pub(crate) fn register_tool(&self, name: String, tool: Arc<dyn Tool>) {
        self.tools
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, tool);
    }

    pub(crate) fn tool(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))
    }
}

/// Cloneable reference to a running agent.
///
/// Handles keep the agent's shared state alive; the directory stores only
/// weak references and upgrades them on lookup.
#[derive(Clone)]
pub struct AgentHandle {
    shared: Arc<AgentShared>,
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.shared.id)
            .field("state", &self.shared.state())
            .finish()
    }
}

impl AgentHandle {
    pub(crate) fn from_shared(shared: Arc<AgentShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<AgentShared> {
        &self.shared
    }

    pub(crate) fn downgrade(&self) -> Weak<AgentShared> {
        Arc::downgrade(&self.shared)
    }

    /// Agent id
    #[must_use]
    pub fn id(&self) -> &AgentId {
        &self.shared.id
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Offered capabilities, sorted
    #[must_use]
    pub fn capabilities(&self) -> Vec<String> {
        self.shared.capabilities.iter().cloned().collect()
    }

    /// Whether the agent offers `capability`
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.shared.capabilities.contains(capability)
    }

    /// Accepting input
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> AgentState {
        self.shared.state()
    }

    /// Tasks waiting in the queue
    #[must_use]
    pub fn queued_tasks(&self) -> usize {
        self.shared.queued_tasks.load(Ordering::SeqCst)
    }

    /// Enqueue a message (FIFO). Fails with `AgentInactive` when not started.
    pub fn receive(&self, message: Message) -> Result<()> {
        self.shared.enqueue_message(message)
    }

    /// Enqueue a task without waiting for its outcome.
    pub fn submit_task(&self, task: AgentTask) -> Result<()> {
        self.shared.enqueue_task(QueuedTask { task, reply: None })
    }

    /// Enqueue a task and get a receiver for its outcome.
    ///
    /// The receiver errors if the agent stops before handling the task.
    pub fn dispatch(&self, task: AgentTask) -> Result<oneshot::Receiver<TaskOutcome>> {
        let (tx, rx) = oneshot::channel();
        self.shared.enqueue_task(QueuedTask {
            task,
            reply: Some(tx),
        })?;
        Ok(rx)
    }

    /// Snapshot of queue depths and progress
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        let shared = &self.shared;
        AgentStatus {
            id: shared.id.clone(),
            state: shared.state(),
            active: shared.is_active(),
            queued_tasks: shared.queued_tasks.load(Ordering::SeqCst),
            pending_messages: shared.pending_messages.load(Ordering::SeqCst),
            current_task: *shared.current_task.lock().unwrap_or_else(|e| e.into_inner()),
            history_len: shared.history.lock().unwrap_or_else(|e| e.into_inner()).len(),
            completed_tasks: shared.completed_tasks.load(Ordering::SeqCst),
        }
    }

    /// Completed tasks, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Serializable snapshot for persistence
    #[must_use]
    pub fn record(&self) -> AgentRecord {
        AgentRecord {
            id: self.shared.id.clone(),
            name: self.shared.name.clone(),
            capabilities: self.capabilities(),
            state: self.shared.state(),
            completed_tasks: self.shared.completed_tasks.load(Ordering::SeqCst),
            updated_at: Utc::now(),
        }
    }
}
