//! Failure policy and accounting around a sink

use super::{Artifact, ArtifactSink, WriteError};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info};

/// Per-handler write counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerStats {
    pub handler: String,
    pub successful: u64,
    pub failed: u64,
    /// Names of artifacts that could not be written
    pub failed_artifacts: Vec<String>,
}

/// A sink plus its failure policy
pub struct OutputHandler {
    sink: Box<dyn ArtifactSink>,
    fail_on_error: bool,
    successful: AtomicU64,
    failed: AtomicU64,
    failed_artifacts: Mutex<Vec<String>>,
}

impl OutputHandler {
    pub fn new(sink: impl ArtifactSink + 'static, fail_on_error: bool) -> Self {
        Self {
            sink: Box::new(sink),
            fail_on_error,
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            failed_artifacts: Mutex::new(Vec::new()),
        }
    }

    pub fn describe(&self) -> String {
        self.sink.describe()
    }

    pub fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    /// Store an artifact. Failures are always logged and counted; they are
    /// returned only when the handler is fail-fast.
    pub async fn write(&self, artifact: &Artifact) -> Result<(), WriteError> {
        match self.sink.store(artifact).await {
            Ok(()) => {
                debug!("Wrote {} to {}", artifact.name(), self.sink.describe());
                self.successful.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                error!(
                    "Failed to write {} (page {}) to {}: {}",
                    artifact.name(),
                    artifact.page_id(),
                    self.sink.describe(),
                    e
                );
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.failed_artifacts.lock().push(artifact.name().to_string());
                if self.fail_on_error {
                    Err(e)
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn stats(&self) -> HandlerStats {
        HandlerStats {
            handler: self.sink.describe(),
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            failed_artifacts: self.failed_artifacts.lock().clone(),
        }
    }

    /// Close the sink and log totals
    pub async fn close(&self) -> Result<(), WriteError> {
        self.sink.close().await?;
        let stats = self.stats();
        info!(
            "{}: wrote {} artifacts: {} successful, {} failed",
            stats.handler,
            stats.successful + stats.failed,
            stats.successful,
            stats.failed
        );
        Ok(())
    }
}

/// All handlers of a run
pub struct Outputs {
    handlers: Vec<OutputHandler>,
}

impl Outputs {
    pub fn new(handlers: Vec<OutputHandler>) -> Self {
        Self { handlers }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Write to every handler concurrently; the first fail-fast error wins
    pub async fn store(&self, artifact: &Artifact) -> Result<(), WriteError> {
        let results = join_all(self.handlers.iter().map(|h| h.write(artifact))).await;
        results.into_iter().collect()
    }

    /// Total failed writes across handlers
    pub fn failed(&self) -> u64 {
        self.handlers.iter().map(|h| h.stats().failed).sum()
    }

    pub fn stats(&self) -> Vec<HandlerStats> {
        self.handlers.iter().map(OutputHandler::stats).collect()
    }

    /// Close every handler, returning the first error after trying all
    pub async fn close(&self) -> Result<(), WriteError> {
        let mut first_error = None;
        for handler in &self.handlers {
            if let Err(e) = handler.close().await {
                error!("Failed to close {}: {}", handler.describe(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
