//! Fine-tune batch export
//!
//! The binary has no trainer of its own: batches are written as JSONL files
//! for an external fine-tuning pipeline to pick up.

use async_trait::async_trait;
use chrono::Utc;
use hive_llm::{FineTuner, LearningExample};
use std::path::PathBuf;
use tracing::info;

pub struct ExportFineTuner {
    dir: PathBuf,
}

impl ExportFineTuner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FineTuner for ExportFineTuner {
    fn name(&self) -> &str {
        "export"
    }

    async fn fine_tune(&self, batch: &[LearningExample]) -> hive_llm::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut body = String::new();
        for example in batch {
            body.push_str(&serde_json::to_string(example)?);
            body.push('\n');
        }

        let path = self
            .dir
            .join(format!("batch-{}.jsonl", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
        tokio::fs::write(&path, body).await?;
        info!(path = %path.display(), examples = batch.len(), "Fine-tune batch exported");
        Ok(())
    }
}
