use super::context::AgentContext;
use crate::error::Result;
use crate::message::Message;
use crate::task::AgentTask;
use hive_llm::{GenerationRequest, ModelPolicy, Tier};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Message handlers
// ============================================================================

/// Handles one kind of message from an agent's mailbox
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle `message`; errors are logged and the mailbox loop continues.
    async fn handle(&self, ctx: &AgentContext, message: Message) -> Result<()>;
}

struct FnMessageHandler<F>(F);

#[async_trait::async_trait]
impl<F, Fut> MessageHandler for FnMessageHandler<F>
where
    F: Fn(AgentContext, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: &AgentContext, message: Message) -> Result<()> {
        (self.0)(ctx.clone(), message).await
    }
}

/// Wrap an async closure as a [`MessageHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(AgentContext, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnMessageHandler(f))
}

// ============================================================================
// Tools
// ============================================================================

/// A named capability an agent can invoke directly
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Run the tool
    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value>;
}

struct FnTool<F>(F);

#[async_trait::async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(serde_json::Value) -> Result<serde_json::Value> + Send + Sync + 'static,
{
    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value> {
        (self.0)(args)
    }
}

/// Wrap a synchronous closure as a [`Tool`].
pub fn tool_fn<F>(f: F) -> Arc<dyn Tool>
where
    F: Fn(serde_json::Value) -> Result<serde_json::Value> + Send + Sync + 'static,
{
    Arc::new(FnTool(f))
}

// ============================================================================
// Task handlers
// ============================================================================

/// Strategy that gives an agent its specialization.
#[async_trait::async_trait]
pub trait TaskHandler: Send + Sync {
    /// Name for logs
    fn name(&self) -> &str;

    /// One-time setup run by `AgentRuntime::initialize`
    async fn initialize(&self, _ctx: &AgentContext) -> Result<()> {
        Ok(())
    }

    /// Handle one task; the returned text becomes the outcome's output.
    async fn handle_task(&self, ctx: &AgentContext, task: &AgentTask) -> Result<Option<String>>;
}

/// Completes every task with no output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTaskHandler;

#[async_trait::async_trait]
impl TaskHandler for NoopTaskHandler {
    fn name(&self) -> &str {
        "noop"
    }

    async fn handle_task(&self, ctx: &AgentContext, task: &AgentTask) -> Result<Option<String>> {
        debug!(agent_id = %ctx.agent_id(), task_id = %task.id, "No-op task handler");
        Ok(None)
    }
}

/// Answers tasks through the model selection policy.
///
/// The prompt is the task description followed by the outputs of any
/// completed dependencies and a non-null payload.
pub struct GenerativeTaskHandler {
    policy: Arc<ModelPolicy>,
    system_prompt: Option<String>,
    tier: Option<Tier>,
}

impl GenerativeTaskHandler {
    /// Handler with automatic tier selection and no system prompt
    #[must_use]
    pub fn new(policy: Arc<ModelPolicy>) -> Self {
        Self {
            policy,
            system_prompt: None,
            tier: None,
        }
    }

    /// Set the agent's system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Always ask for `tier`
    #[must_use]
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Build the prompt sent to the policy
    #[must_use]
    pub fn render_prompt(task: &AgentTask) -> String {
        let mut prompt = task.description.clone();
        if !task.context.is_empty() {
            prompt.push_str("\n\nResults from earlier steps:");
            for (subtask_id, output) in &task.context {
                prompt.push_str(&format!("\n\n[{}]\n{}", subtask_id, output));
            }
        }
        if !task.payload.is_null() {
            prompt.push_str(&format!("\n\nInput:\n{}", task.payload));
        }
        prompt
    }
}

#[async_trait::async_trait]
impl TaskHandler for GenerativeTaskHandler {
    fn name(&self) -> &str {
        "generative"
    }

    async fn handle_task(&self, ctx: &AgentContext, task: &AgentTask) -> Result<Option<String>> {
        let mut request = GenerationRequest::new(Self::render_prompt(task));
        if let Some(system_prompt) = &self.system_prompt {
            request = request.with_system_prompt(system_prompt.clone());
        }
        if let Some(tier) = self.tier {
            request = request.with_tier(tier);
        }

        let result = self.policy.generate(request).await?;
        debug!(
            agent_id = %ctx.agent_id(),
            task_id = %task.id,
            tier = %result.tier,
            cached = result.cached,
            "Generated task output"
        );
        Ok(Some(result.text))
    }
}
