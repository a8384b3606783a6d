//! Generation provider trait definition
//!
//! Every tier is backed by one provider. Providers only turn a prompt into
//! text; tier selection, caching and fallback live in [`crate::policy`].

mod http;
mod mock;

pub use http::{HttpProvider, HttpProviderConfig};
pub use mock::MockProvider;

use crate::error::Result;

/// Trait for generation providers
#[async_trait::async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Whether credentials/endpoint are present so the provider can be tried.
    ///
    /// The policy skips automatic selection of an unconfigured primary tier.
    fn is_configured(&self) -> bool {
        true
    }

    /// Generate text for a prompt
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String>;
}
