//! Learning-example log
//!
//! Successful generations are appended as JSON lines so the tertiary tier
//! can later be fine-tuned on higher-tier output. Callers only push onto an
//! unbounded channel; a background writer task owns the file.

use crate::error::Result;
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// One prompt/response pair captured from a successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningExample {
    /// User prompt
    pub prompt: String,
    /// System prompt, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Generated text
    pub response: String,
    /// Tier that produced the response
    pub tier: Tier,
    /// When the response was produced
    pub timestamp: DateTime<Utc>,
}

impl LearningExample {
    /// Create an example stamped with the current time.
    pub fn new(
        prompt: impl Into<String>,
        system_prompt: Option<String>,
        response: impl Into<String>,
        tier: Tier,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt,
            response: response.into(),
            tier,
            timestamp: Utc::now(),
        }
    }
}

enum LogCommand {
    Append(Box<LearningExample>),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget writer for learning examples.
#[derive(Debug)]
pub struct LearningLog {
    sender: Mutex<Option<mpsc::UnboundedSender<LogCommand>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for LogCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append(_) => f.write_str("Append"),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl LearningLog {
    /// A log that drops every example.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            sender: Mutex::new(None),
            writer: Mutex::new(None),
            path: None,
        }
    }

    /// Start a background writer appending to `path`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(path.clone(), rx));
        info!(path = %path.display(), "Learning log writer started");

        Self {
            sender: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
            path: Some(path),
        }
    }

    /// Log file location, if enabled.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether examples are being written
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Queue an example. Never blocks and never fails the caller.
    pub fn record(&self, example: LearningExample) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = sender.as_ref() {
            if tx.send(LogCommand::Append(Box::new(example))).is_err() {
                debug!("Learning log writer has stopped; example dropped");
            }
        }
    }

    /// Wait until every queued example has reached the file.
    pub async fn flush(&self) {
        let ack = {
            let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
            let Some(tx) = sender.as_ref() else {
                return;
            };
            let (ack_tx, ack_rx) = oneshot::channel();
            if tx.send(LogCommand::Flush(ack_tx)).is_err() {
                return;
            }
            ack_rx
        };
        let _ = ack.await;
    }

    /// Stop accepting examples and wait for the writer to drain.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(sender);

        let writer = self.writer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = writer {
            if let Err(e) = handle.await {
                warn!(error = %e, "Learning log writer ended abnormally");
            }
        }
    }
}

async fn run_writer(path: PathBuf, mut rx: mpsc::UnboundedReceiver<LogCommand>) {
    let mut file = match open_append(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Cannot open learning log; examples will be dropped");
            while let Some(command) = rx.recv().await {
                if let LogCommand::Flush(ack) = command {
                    let _ = ack.send(());
                }
            }
            return;
        }
    };

    while let Some(command) = rx.recv().await {
        match command {
            LogCommand::Append(example) => {
                let line = match serde_json::to_string(&example) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize learning example");
                        continue;
                    }
                };
                if let Err(e) = file.write_all(format!("{}\n", line).as_bytes()).await {
                    warn!(path = %path.display(), error = %e, "Failed to append learning example");
                }
            }
            LogCommand::Flush(ack) => {
                if let Err(e) = file.flush().await {
                    warn!(error = %e, "Failed to flush learning log");
                }
                let _ = ack.send(());
            }
        }
    }

    if let Err(e) = file.flush().await {
        warn!(error = %e, "Failed to flush learning log on shutdown");
    }
    debug!(path = %path.display(), "Learning log writer stopped");
}

async fn open_append(path: &Path) -> std::io::Result<tokio::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
}

/// Read examples starting at line `offset`.
///
/// Returns the parsed examples and the line offset just past the last line
/// read. Malformed lines are skipped with a warning but still advance the
/// offset. A missing file yields no examples.
pub async fn read_examples(
    path: impl AsRef<Path>,
    offset: usize,
) -> Result<(Vec<LearningExample>, usize)> {
    let path = path.as_ref();
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), offset)),
        Err(e) => return Err(e.into()),
    };

    let mut examples = Vec::new();
    let mut next = offset;
    // Only complete lines are consumed; a trailing partial write is left for later.
    for (index, line) in raw.split_inclusive('\n').enumerate().skip(offset) {
        if !line.ends_with('\n') {
            break;
        }
        next = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<LearningExample>(line) {
            Ok(example) => examples.push(example),
            Err(e) => warn!(line = index + 1, error = %e, "Skipping malformed learning example"),
        }
    }

    Ok((examples, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learning").join("examples.jsonl");
        let log = LearningLog::spawn(&path);

        log.record(LearningExample::new("p1", None, "r1", Tier::Primary));
        log.record(LearningExample::new(
            "p2",
            Some("sys".to_string()),
            "r2",
            Tier::Tertiary,
        ));
        log.flush().await;

        let (examples, next) = read_examples(&path, 0).await.unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(next, 2);
        assert_eq!(examples[0].prompt, "p1");
        assert_eq!(examples[1].system_prompt.as_deref(), Some("sys"));
        assert_eq!(examples[1].tier, Tier::Tertiary);

        log.shutdown().await;
    }

    #[tokio::test]
    async fn test_read_from_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.jsonl");
        let log = LearningLog::spawn(&path);
        for i in 0..3 {
            log.record(LearningExample::new(format!("p{}", i), None, "r", Tier::Primary));
        }
        log.shutdown().await;

        let (examples, next) = read_examples(&path, 2).await.unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].prompt, "p2");
        assert_eq!(next, 3);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.jsonl");
        let good = serde_json::to_string(&LearningExample::new("p", None, "r", Tier::Primary))
            .unwrap();
        tokio::fs::write(&path, format!("garbage\n{}\n{{partial", good))
            .await
            .unwrap();

        let (examples, next) = read_examples(&path, 0).await.unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(next, 2);
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (examples, next) = read_examples(dir.path().join("none.jsonl"), 4)
            .await
            .unwrap();
        assert!(examples.is_empty());
        assert_eq!(next, 4);
    }

    #[tokio::test]
    async fn test_disabled_log_accepts_records() {
        let log = LearningLog::disabled();
        assert!(!log.is_enabled());
        log.record(LearningExample::new("p", None, "r", Tier::Primary));
        log.flush().await;
        log.shutdown().await;
    }

    #[tokio::test]
    async fn test_record_after_shutdown_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.jsonl");
        let log = LearningLog::spawn(&path);
        log.shutdown().await;

        log.record(LearningExample::new("late", None, "r", Tier::Primary));
        let (examples, _) = read_examples(&path, 0).await.unwrap();
        assert!(examples.is_empty());
    }
}
