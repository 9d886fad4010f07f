//! Progress tracking for extraction runs

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared between the parse thread, the dispatch loop and the CLI
pub struct RunProgress {
    /// Spinner (None in quiet mode)
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
    mappings_found: AtomicU64,
    pages_seen: AtomicU64,
    pages_matched: AtomicU64,
    pages_unmapped: AtomicU64,
    artifacts_dispatched: AtomicU64,
    cancelled: AtomicBool,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub mappings_found: u64,
    pub pages_seen: u64,
    pub pages_matched: u64,
    pub pages_unmapped: u64,
    pub artifacts_dispatched: u64,
    pub elapsed_seconds: f64,
}

impl RunProgress {
    /// Create a tracker; `quiet` suppresses the terminal spinner
    pub fn new(quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(200));
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            mappings_found: AtomicU64::new(0),
            pages_seen: AtomicU64::new(0),
            pages_matched: AtomicU64::new(0),
            pages_unmapped: AtomicU64::new(0),
            artifacts_dispatched: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Tracker without terminal output
    pub fn hidden() -> Self {
        Self::new(true)
    }

    /// Record the final size of the identifier map
    pub fn set_mappings(&self, count: u64) {
        self.mappings_found.store(count, Ordering::Relaxed);
        self.message(format!("{} mappings loaded", count));
    }

    /// A `page` element closed
    pub fn page_seen(&self, matched: bool) {
        let seen = self.pages_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if matched {
            self.pages_matched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.pages_unmapped.fetch_add(1, Ordering::Relaxed);
        }

        if seen % 1000 == 0 {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 { seen as f64 / elapsed } else { 0.0 };
            self.message(format!(
                "{} pages | {} matched | {:.1} pages/s",
                seen,
                self.pages_matched.load(Ordering::Relaxed),
                rate
            ));
        }
    }

    /// An artifact passed the gate and was handed to the outputs
    pub fn artifact_dispatched(&self) {
        self.artifacts_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Request cancellation; parse loops stop at their next check
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Current counter values
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            mappings_found: self.mappings_found.load(Ordering::Relaxed),
            pages_seen: self.pages_seen.load(Ordering::Relaxed),
            pages_matched: self.pages_matched.load(Ordering::Relaxed),
            pages_unmapped: self.pages_unmapped.load(Ordering::Relaxed),
            artifacts_dispatched: self.artifacts_dispatched.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }

    /// Stop the spinner
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            let snap = self.snapshot();
            pb.finish_with_message(format!(
                "Done: {} pages scanned, {} artifacts dispatched",
                snap.pages_seen, snap.artifacts_dispatched
            ));
        }
    }

    fn message(&self, msg: String) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(msg);
        }
    }
}
