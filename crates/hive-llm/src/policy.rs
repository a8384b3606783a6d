//! Model Selection Policy
//!
//! Chooses a tier for each generation request and handles everything around
//! the provider call:
//!
//! ```text
//! tier hint? ──yes──────────────────────────────┐
//!     │no                                       ▼
//!     ├─ primary configured && quota left ─▶ primary
//!     └─ otherwise ────────────────────────▶ tertiary
//!
//! cache hit? ─▶ return cached text (no quota, no provider call)
//! provider error ─▶ tier.fallback() ─▶ retry once lower, tertiary is terminal
//! success ─▶ cache insert + learning log (fire-and-forget)
//! ```

mod config;

pub use config::PolicyConfig;

use crate::cache::ResponseCache;
use crate::error::{Error, Result};
use crate::learning::{LearningExample, LearningLog};
use crate::provider::GenerationProvider;
use crate::quota::QuotaCounter;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// A request for generated text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: String,
    /// Optional system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Force a tier instead of automatic selection
    #[serde(default)]
    pub tier_hint: Option<Tier>,
}

impl GenerationRequest {
    /// Create a request with automatic tier selection
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            tier_hint: None,
        }
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Force a tier
    #[must_use]
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier_hint = Some(tier);
        self
    }
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Tier that produced the text
    pub tier: Tier,
    /// Generated text
    pub text: String,
    /// Served from the response cache
    pub cached: bool,
    /// First tier that failed before falling back, if any
    pub fallback_from: Option<Tier>,
    /// Wall-clock time spent in `generate`
    pub duration_ms: u64,
}

/// Builder for [`ModelPolicy`]
pub struct ModelPolicyBuilder {
    config: PolicyConfig,
    providers: HashMap<Tier, Arc<dyn GenerationProvider>>,
}

impl ModelPolicyBuilder {
    /// Start from a configuration
    #[must_use]
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            providers: HashMap::new(),
        }
    }

    /// Attach the provider backing `tier`
    #[must_use]
    pub fn provider(mut self, tier: Tier, provider: Arc<dyn GenerationProvider>) -> Self {
        self.providers.insert(tier, provider);
        self
    }

    /// Build the policy, loading persisted quota state and starting the
    /// learning-log writer when configured.
    pub async fn build(self) -> Result<ModelPolicy> {
        let quota = match &self.config.quota_state_path {
            Some(path) => QuotaCounter::load(self.config.primary_daily_cap, path).await?,
            None => QuotaCounter::new(self.config.primary_daily_cap),
        };
        let cache = ResponseCache::new(
            Duration::from_secs(self.config.cache_ttl_secs),
            self.config.cache_max_entries,
        );
        let learning = match &self.config.learning_log_path {
            Some(path) => LearningLog::spawn(path),
            None => LearningLog::disabled(),
        };

        for tier in Tier::ALL {
            if let Some(provider) = self.providers.get(&tier) {
                info!(
                    tier = %tier,
                    provider = provider.name(),
                    configured = provider.is_configured(),
                    "Registered generation provider"
                );
            }
        }

        Ok(ModelPolicy {
            providers: self.providers,
            quota,
            cache,
            learning,
        })
    }
}

/// Tiered provider selection with quota, cache and learning capture.
pub struct ModelPolicy {
    providers: HashMap<Tier, Arc<dyn GenerationProvider>>,
    quota: QuotaCounter,
    cache: ResponseCache,
    learning: LearningLog,
}

impl ModelPolicy {
    /// Start building a policy
    #[must_use]
    pub fn builder(config: PolicyConfig) -> ModelPolicyBuilder {
        ModelPolicyBuilder::new(config)
    }

    /// Whether a provider is registered for `tier`
    #[must_use]
    pub fn has_tier(&self, tier: Tier) -> bool {
        self.providers.contains_key(&tier)
    }

    /// Quota counter for the primary tier
    #[must_use]
    pub fn quota(&self) -> &QuotaCounter {
        &self.quota
    }

    /// Response cache
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Learning-example log
    #[must_use]
    pub fn learning_log(&self) -> &LearningLog {
        &self.learning
    }

    /// Convenience wrapper returning only the text.
    pub async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        tier_hint: Option<Tier>,
    ) -> Result<String> {
        let request = GenerationRequest {
            prompt: prompt.to_string(),
            system_prompt: system_prompt.map(str::to_string),
            tier_hint,
        };
        self.generate(request).await.map(|r| r.text)
    }

    /// Generate text, selecting and falling back between tiers.
    #[instrument(skip(self, request), fields(hint = ?request.tier_hint))]
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        let start = Instant::now();
        let automatic = request.tier_hint.is_none();
        let mut tier = match request.tier_hint {
            Some(tier) => tier,
            None => self.select_tier().await,
        };
        let mut fallback_from = None;
        let system_prompt = request.system_prompt.as_deref();

        loop {
            if let Some(text) = self.cache.get(&request.prompt, system_prompt, tier).await {
                debug!(tier = %tier, "Serving generation from cache");
                return Ok(GenerationResult {
                    tier,
                    text,
                    cached: true,
                    fallback_from,
                    duration_ms: start.elapsed().as_millis() as u64,
                });
            }

            if tier == Tier::Primary {
                if !automatic {
                    self.quota.record().await;
                } else if !self.quota.try_acquire().await {
                    // Lost the race for the last slot; downgrade silently.
                    debug!("Primary quota exhausted during selection, using tertiary");
                    tier = Tier::Tertiary;
                    continue;
                }
            }

            match self.invoke(tier, &request.prompt, system_prompt).await {
                Ok(text) => {
                    self.cache
                        .insert(&request.prompt, system_prompt, tier, &text)
                        .await;
                    self.learning.record(LearningExample::new(
                        request.prompt.clone(),
                        request.system_prompt.clone(),
                        text.clone(),
                        tier,
                    ));

                    let duration_ms = start.elapsed().as_millis() as u64;
                    debug!(tier = %tier, duration_ms, "Generation succeeded");
                    return Ok(GenerationResult {
                        tier,
                        text,
                        cached: false,
                        fallback_from,
                        duration_ms,
                    });
                }
                Err(e) => match tier.fallback() {
                    Some(next) => {
                        warn!(tier = %tier, next = %next, error = %e, "Provider failed, falling back");
                        fallback_from.get_or_insert(tier);
                        tier = next;
                    }
                    None => {
                        warn!(tier = %tier, error = %e, "Lowest tier failed");
                        return Err(e);
                    }
                },
            }
        }
    }

    /// Flush the learning log and drop cached responses.
    pub async fn shutdown(&self) {
        self.learning.shutdown().await;
        self.cache.clear().await;
        info!("Model policy shut down");
    }

    /// Automatic choice: primary while usable and within quota, else tertiary.
    async fn select_tier(&self) -> Tier {
        let primary_ready = self
            .providers
            .get(&Tier::Primary)
            .is_some_and(|p| p.is_configured());
        if primary_ready && self.quota.is_available().await {
            Tier::Primary
        } else {
            Tier::Tertiary
        }
    }

    async fn invoke(&self, tier: Tier, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        let provider = self
            .providers
            .get(&tier)
            .ok_or_else(|| Error::NotConfigured(format!("no provider for {} tier", tier)))?;
        provider.generate(prompt, system_prompt).await
    }
}

#[cfg(test)]
mod tests;
