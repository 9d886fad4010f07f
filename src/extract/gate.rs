//! Bounded concurrency gate for artifact writes
//!
//! A counting admission gate: at most `limit` permits are out at once and
//! callers beyond that wait in FIFO order. A limit of `0` disables the gate
//! entirely. Backed by `tokio::sync::Semaphore`, which hands out permits in
//! request order.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admission gate shared by every write dispatched in a run
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Option<Arc<Semaphore>>,
    limit: usize,
}

/// Held while a write is in flight; dropping it releases the slot
#[derive(Debug)]
pub struct GatePermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl GatePermit {
    /// Release the slot explicitly
    pub fn release(self) {}
}

impl ConcurrencyGate {
    /// Create a gate admitting `limit` concurrent holders (`0` = unlimited)
    pub fn new(limit: usize) -> Self {
        let semaphore = if limit > 0 {
            Some(Arc::new(Semaphore::new(limit)))
        } else {
            None
        };
        Self { semaphore, limit }
    }

    /// Gate that never blocks
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Configured limit, `None` when unlimited
    pub fn limit(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|_| self.limit)
    }

    /// Free slots right now, `None` when unlimited
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Wait for a slot
    pub async fn acquire(&self) -> GatePermit {
        let permit = match &self.semaphore {
            // The semaphore is owned here and never closed, so acquire cannot fail
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        };
        GatePermit { _permit: permit }
    }
}
