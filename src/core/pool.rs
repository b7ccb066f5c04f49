//! Bounded worker pool for blocking model inference

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::core::errors::{Result, TranslationError};

/// Default number of concurrently running inference jobs
pub const DEFAULT_MAX_WORKERS: usize = 50;

/// Process-wide pool bounding concurrent inference jobs.
///
/// Jobs run on tokio's blocking threads; a semaphore permit is held for the
/// whole job so at most `capacity` of them execute at once. Cloning shares
/// the same permits.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
    submitted: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Create a pool with `capacity` workers (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            submitted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Workers not currently running a job
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Number of jobs submitted since the pool was created
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Run `job` on a worker once one is free.
    ///
    /// A panicking job is reported as an inference error.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.submitted.fetch_add(1, Ordering::Relaxed);

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| TranslationError::inference(format!("worker pool closed: {}", e)))?;

        debug!(idle = self.permits.available_permits(), "Dispatching job to worker");

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = ?e, "Worker job aborted");
                Err(TranslationError::inference(format!("worker failed: {}", e)))
            }
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}
