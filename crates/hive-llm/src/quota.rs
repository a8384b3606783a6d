//! Primary-tier quota tracking
//!
//! Counts primary-tier requests per UTC day. The count only gates automatic
//! tier selection; explicit requests for the primary tier are still counted
//! but never refused. When a state path is configured the counter survives
//! restarts.

use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Point-in-time view of the quota window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// UTC day the counter belongs to
    pub window: NaiveDate,
    /// Primary requests counted in this window
    pub used: u64,
    /// Daily cap (0 = unlimited)
    pub cap: u64,
}

impl QuotaSnapshot {
    /// Requests left before automatic selection stops picking primary.
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        (self.cap > 0).then(|| self.cap.saturating_sub(self.used))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuotaWindow {
    window: NaiveDate,
    used: u64,
}

impl QuotaWindow {
    fn starting(now: DateTime<Utc>) -> Self {
        Self {
            window: now.date_naive(),
            used: 0,
        }
    }

    /// Reset the counter when `now` falls in a later day.
    fn roll(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today > self.window {
            debug!(previous = %self.window, used = self.used, "Quota window reset");
            self.window = today;
            self.used = 0;
        }
    }
}

/// Daily request counter for the primary tier.
#[derive(Debug)]
pub struct QuotaCounter {
    cap: u64,
    state: Mutex<QuotaWindow>,
    path: Option<PathBuf>,
}

impl QuotaCounter {
    /// Create an in-memory counter.
    #[must_use]
    pub fn new(cap: u64) -> Self {
        Self {
            cap,
            state: Mutex::new(QuotaWindow::starting(Utc::now())),
            path: None,
        }
    }

    /// Create a counter persisted at `path`, restoring any saved window.
    ///
    /// A missing file starts a fresh window. An unreadable file is logged
    /// and replaced on the next increment.
    pub async fn load(cap: u64, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<QuotaWindow>(&raw) {
                Ok(window) => window,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding unreadable quota state");
                    QuotaWindow::starting(Utc::now())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                QuotaWindow::starting(Utc::now())
            }
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), cap, used = state.used, "Quota counter loaded");

        Ok(Self {
            cap,
            state: Mutex::new(state),
            path: Some(path),
        })
    }

    /// Daily cap (0 = unlimited).
    #[must_use]
    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Whether automatic selection may still pick the primary tier.
    pub async fn is_available(&self) -> bool {
        self.is_available_at(Utc::now()).await
    }

    /// Count one automatic primary selection if the cap allows it.
    ///
    /// Returns `false` (and counts nothing) when the window is exhausted.
    pub async fn try_acquire(&self) -> bool {
        self.try_acquire_at(Utc::now()).await
    }

    /// Count one explicitly requested primary call, ignoring the cap.
    pub async fn record(&self) {
        self.record_at(Utc::now()).await;
    }

    /// Current window state.
    pub async fn snapshot(&self) -> QuotaSnapshot {
        let mut state = self.state.lock().await;
        state.roll(Utc::now());
        QuotaSnapshot {
            window: state.window,
            used: state.used,
            cap: self.cap,
        }
    }

    pub(crate) async fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().await;
        state.roll(now);
        self.cap == 0 || state.used < self.cap
    }

    pub(crate) async fn try_acquire_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().await;
        state.roll(now);
        if self.cap > 0 && state.used >= self.cap {
            debug!(used = state.used, cap = self.cap, "Primary quota exhausted");
            return false;
        }
        state.used += 1;
        self.persist(&state).await;
        true
    }

    pub(crate) async fn record_at(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        state.roll(now);
        state.used += 1;
        self.persist(&state).await;
    }

    /// Write the window while the lock is held so writes never interleave.
    async fn persist(&self, state: &QuotaWindow) {
        let Some(path) = &self.path else {
            return;
        };

        let result = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let raw = serde_json::to_vec(state)?;
            tokio::fs::write(path, raw).await?;
            Ok::<_, crate::error::Error>(())
        }
        .await;

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Failed to persist quota state");
        }
    }
}

#[cfg(test)]
mod tests;
