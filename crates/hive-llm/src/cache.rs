//! Response cache
//!
//! Identical `(prompt, system prompt, tier)` requests inside the TTL are
//! answered from memory. Expired entries are purged whenever a new entry is
//! inserted; when the cache is full the oldest entry is evicted.

use crate::tier::Tier;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    text: String,
    inserted_at: Instant,
}

/// TTL cache of generated text.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

/// Stable cache key for a request.
#[must_use]
pub fn cache_key(prompt: &str, system_prompt: Option<&str>, tier: Tier) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tier.as_str().as_bytes());
    hasher.update([0u8]);
    match system_prompt {
        Some(system) => {
            hasher.update([1u8]);
            hasher.update(system.as_bytes());
        }
        None => hasher.update([0u8]),
    }
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl ResponseCache {
    /// Create a cache. A zero TTL disables caching.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Whether caching is active
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Look up a live entry.
    pub async fn get(&self, prompt: &str, system_prompt: Option<&str>, tier: Tier) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let key = cache_key(prompt, system_prompt, tier);
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.text.clone())
    }

    /// Store a response, purging expired entries first.
    pub async fn insert(&self, prompt: &str, system_prompt: Option<&str>, tier: Tier, text: &str) {
        if !self.is_enabled() {
            return;
        }
        let key = cache_key(prompt, system_prompt, tier);
        let mut entries = self.entries.write().await;

        let ttl = self.ttl;
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        if entries.len() < before {
            debug!(purged = before - entries.len(), "Purged expired cache entries");
        }

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                text: text.to_string(),
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        before - entries.len()
    }

    /// Number of stored entries (including not-yet-purged expired ones).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove everything.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests;
