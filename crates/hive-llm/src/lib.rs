//! Hive LLM - Tiered Model Selection
//!
//! This crate decides which generation provider answers a prompt:
//! - Tier: Ordered fallback levels (primary, secondary, tertiary)
//! - Provider: The `GenerationProvider` trait plus an OpenAI-compatible HTTP client
//! - Quota: Daily cap on automatic selection of the metered primary tier
//! - Cache: TTL response cache keyed by prompt, system prompt and tier
//! - Learning: Append-only log of successful generations
//! - Training: Periodic batch job that feeds the log to a fine-tuner

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod learning;
pub mod policy;
pub mod provider;
pub mod quota;
pub mod tier;
pub mod training;

pub use cache::ResponseCache;
pub use error::{Error, Result};
pub use learning::{read_examples, LearningExample, LearningLog};
pub use policy::{
    GenerationRequest, GenerationResult, ModelPolicy, ModelPolicyBuilder, PolicyConfig,
};
pub use provider::{GenerationProvider, HttpProvider, HttpProviderConfig, MockProvider};
pub use quota::{QuotaCounter, QuotaSnapshot};
pub use tier::Tier;
pub use training::{FineTuneConfig, FineTuneJob, FineTuner};
