//! Mock generation provider for testing
//!
//! Counts invocations and records prompts so tests can assert on how the
//! policy used each tier.

use super::GenerationProvider;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockReply {
    Echo,
    Fixed(String),
    Fail(String),
}

/// A mock provider that echoes, returns a fixed reply, or always fails.
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    reply: MockReply,
    configured: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    fn with_reply(name: impl Into<String>, reply: MockReply) -> Self {
        Self {
            name: name.into(),
            reply,
            configured: true,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies with `"<name>: <prompt>"`.
    #[must_use]
    pub fn echo(name: impl Into<String>) -> Self {
        Self::with_reply(name, MockReply::Echo)
    }

    /// Always replies with `text`.
    #[must_use]
    pub fn fixed(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_reply(name, MockReply::Fixed(text.into()))
    }

    /// Always fails with a provider error.
    #[must_use]
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_reply(name, MockReply::Fail(message.into()))
    }

    /// Report the provider as missing credentials.
    #[must_use]
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Sleep before replying.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `generate` calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl GenerationProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, prompt: &str, _system_prompt: Option<&str>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            MockReply::Echo => Ok(format!("{}: {}", self.name, prompt)),
            MockReply::Fixed(text) => Ok(text.clone()),
            MockReply::Fail(message) => Err(Error::provider(&self.name, message.clone())),
        }
    }
}
