//! Two-phase extraction run

use super::error::PipelineError;
use super::gate::ConcurrencyGate;
use super::mapping::{build_identifier_map, IdentifierMap};
use super::progress::{ProgressSnapshot, RunProgress};
use super::source::SourceOpener;
use super::splitter::{extract_pages, SplitStats};
use crate::config::SourcesConfig;
use crate::output::{HandlerStats, Outputs};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Result of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub mappings: usize,
    pub pages: SplitStats,
    pub progress: ProgressSnapshot,
    pub outputs: Vec<HandlerStats>,
    /// Writes that failed under the lenient policy
    pub skipped_writes: u64,
}

/// One extraction run: identifier map first, then the page dump
pub struct Pipeline {
    sources: SourcesConfig,
    max_concurrent: usize,
    opener: SourceOpener,
    progress: Arc<RunProgress>,
}

impl Pipeline {
    pub fn new(
        sources: SourcesConfig,
        max_concurrent: usize,
        progress: Arc<RunProgress>,
    ) -> Result<Self, PipelineError> {
        let opener = SourceOpener::new(
            &sources.user_agent,
            Duration::from_secs(sources.request_timeout_secs),
            sources.chunk_size,
        )?;
        Ok(Self {
            sources,
            max_concurrent,
            opener,
            progress,
        })
    }

    /// Shared progress tracker (also used to cancel the run)
    pub fn progress(&self) -> &Arc<RunProgress> {
        &self.progress
    }

    /// Phase one: read the whole `page_props` dump into an identifier map
    pub async fn build_map(&self) -> Result<IdentifierMap, PipelineError> {
        info!("Fetching mappings from {}", self.sources.mappings);
        let stream = self.opener.open(&self.sources.mappings).await?;
        build_identifier_map(
            stream,
            self.sources.mappings_compression(),
            &self.sources.property,
            self.sources.scan_tail_bytes,
            self.sources.chunk_size,
            self.progress.clone(),
        )
        .await
    }

    /// Run both phases and close every output.
    ///
    /// Outputs are closed even when the page phase fails, so buffered handlers
    /// flush whatever was written.
    pub async fn run(&self, outputs: Outputs) -> Result<RunSummary, PipelineError> {
        let map = self.build_map().await?;
        let mappings = map.len();
        if map.is_empty() {
            warn!(
                "No '{}' mappings found; no artifacts will be written",
                self.sources.property
            );
        }

        info!("Processing pages from {}", self.sources.pages);
        let outputs = Arc::new(outputs);
        let gate = ConcurrencyGate::new(self.max_concurrent);
        let pages = match self.opener.open(&self.sources.pages).await {
            Ok(stream) => {
                extract_pages(
                    stream,
                    self.sources.pages_compression(),
                    Arc::new(map),
                    gate,
                    outputs.clone(),
                    self.progress.clone(),
                )
                .await
            }
            Err(e) => Err(e.into()),
        };

        let closed = outputs.close().await;
        self.progress.finish();

        let pages = pages.map_err(|e| {
            error!("Run aborted: {}", e);
            e
        })?;
        closed?;

        let summary = RunSummary {
            mappings,
            pages,
            progress: self.progress.snapshot(),
            outputs: outputs.stats(),
            skipped_writes: outputs.failed(),
        };
        info!(
            "All done: {} pages, {} artifacts dispatched, {} writes skipped",
            summary.pages.pages, summary.progress.artifacts_dispatched, summary.skipped_writes
        );
        Ok(summary)
    }
}
