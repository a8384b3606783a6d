//! Periodic fine-tuning of the tertiary tier
//!
//! A batch job that tails the learning log and hands higher-tier examples to
//! a [`FineTuner`]. It runs on its own interval and never touches the
//! request path.

use crate::error::Result;
use crate::learning::{read_examples, LearningExample};
use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Consumer of learning batches (e.g. a LoRA trainer for the local model).
#[async_trait::async_trait]
pub trait FineTuner: Send + Sync {
    /// Trainer name for logs
    fn name(&self) -> &str;

    /// Train on one batch of examples
    async fn fine_tune(&self, batch: &[LearningExample]) -> Result<()>;
}

/// Fine-tune job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineTuneConfig {
    /// Seconds between runs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Minimum number of new examples before a batch is submitted
    #[serde(default = "default_min_batch")]
    pub min_batch: usize,
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_min_batch() -> usize {
    50
}

impl Default for FineTuneConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            min_batch: default_min_batch(),
        }
    }
}

#[derive(Debug, Default)]
struct JobCursor {
    /// Next unread line in the log
    offset: usize,
    /// Higher-tier examples read but not yet submitted
    pending: Vec<LearningExample>,
}

/// Batch job feeding the learning log to a fine-tuner.
pub struct FineTuneJob {
    log_path: PathBuf,
    tuner: Arc<dyn FineTuner>,
    config: FineTuneConfig,
    cursor: Mutex<JobCursor>,
}

impl FineTuneJob {
    /// Create a job reading `log_path` from the beginning.
    pub fn new(
        log_path: impl Into<PathBuf>,
        tuner: Arc<dyn FineTuner>,
        config: FineTuneConfig,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            tuner,
            config,
            cursor: Mutex::new(JobCursor::default()),
        }
    }

    /// Run one pass. Returns the number of examples submitted for training.
    ///
    /// Tertiary-tier examples are skipped: the local model learns only from
    /// its betters. On trainer failure the batch is kept for the next pass.
    pub async fn run_once(&self) -> Result<usize> {
        let mut cursor = self.cursor.lock().await;
        let (examples, next) = read_examples(&self.log_path, cursor.offset).await?;
        cursor.offset = next;
        cursor
            .pending
            .extend(examples.into_iter().filter(|e| e.tier != Tier::Tertiary));

        if cursor.pending.len() < self.config.min_batch.max(1) {
            debug!(
                pending = cursor.pending.len(),
                min_batch = self.config.min_batch,
                "Not enough learning examples for a batch"
            );
            return Ok(0);
        }

        let count = cursor.pending.len();
        info!(tuner = self.tuner.name(), examples = count, "Submitting fine-tune batch");
        self.tuner.fine_tune(&cursor.pending).await?;
        cursor.pending.clear();
        Ok(count)
    }

    /// Run `run_once` every `interval_secs` until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            warn!(tuner = self.tuner.name(), error = %e, "Fine-tune pass failed");
                        }
                    }
                }
            }
            debug!("Fine-tune job stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::learning::LearningLog;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTuner {
        batches: AtomicUsize,
        examples: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait::async_trait]
    impl FineTuner for CountingTuner {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fine_tune(&self, batch: &[LearningExample]) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::provider("counting", "trainer offline"));
            }
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.examples.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    async fn write_log(path: &std::path::Path, tiers: &[Tier]) {
        let log = LearningLog::spawn(path);
        for (i, tier) in tiers.iter().enumerate() {
            log.record(LearningExample::new(format!("p{}", i), None, "r", *tier));
        }
        log.shutdown().await;
    }

    #[tokio::test]
    async fn test_batches_skip_tertiary_examples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.jsonl");
        write_log(&path, &[Tier::Primary, Tier::Tertiary, Tier::Secondary]).await;

        let tuner = Arc::new(CountingTuner::default());
        let job = FineTuneJob::new(
            &path,
            tuner.clone(),
            FineTuneConfig {
                interval_secs: 1,
                min_batch: 2,
            },
        );

        assert_eq!(job.run_once().await.unwrap(), 2);
        assert_eq!(tuner.examples.load(Ordering::SeqCst), 2);

        // Nothing new since the last pass
        assert_eq!(job.run_once().await.unwrap(), 0);
        assert_eq!(tuner.batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_waits_for_min_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.jsonl");
        write_log(&path, &[Tier::Primary]).await;

        let tuner = Arc::new(CountingTuner::default());
        let job = FineTuneJob::new(
            &path,
            tuner.clone(),
            FineTuneConfig {
                interval_secs: 1,
                min_batch: 2,
            },
        );
        assert_eq!(job.run_once().await.unwrap(), 0);

        let log = LearningLog::spawn(&path);
        log.record(LearningExample::new("late", None, "r", Tier::Primary));
        log.shutdown().await;

        assert_eq!(job.run_once().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.jsonl");
        write_log(&path, &[Tier::Primary]).await;

        let tuner = Arc::new(CountingTuner::default());
        tuner.fail.store(true, Ordering::SeqCst);
        let job = FineTuneJob::new(
            &path,
            tuner.clone(),
            FineTuneConfig {
                interval_secs: 1,
                min_batch: 1,
            },
        );
        assert!(job.run_once().await.is_err());

        tuner.fail.store(false, Ordering::SeqCst);
        assert_eq!(job.run_once().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_spawned_job_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let job = Arc::new(FineTuneJob::new(
            dir.path().join("examples.jsonl"),
            Arc::new(CountingTuner::default()),
            FineTuneConfig::default(),
        ));
        let cancel = CancellationToken::new();
        let handle = job.spawn(cancel.clone());
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("job should stop")
            .unwrap();
    }
}
