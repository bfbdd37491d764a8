//! Bounded access to the layer store.
//!
//! Analyses are CPU-bound, so each one runs on the blocking pool while
//! holding a permit. The permit travels with the blocking task: it is
//! released when the work finishes, fails or panics, even if the request
//! already gave up waiting for it.

use std::sync::Arc;
use std::time::Duration;

use hazmap::{HazardError, Result, SpatialStore};
use tokio::sync::Semaphore;

/// Semaphore-bounded runner for store work.
#[derive(Debug)]
pub struct StoreGate {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    acquire_timeout: Duration,
    statement_timeout: Duration,
}

impl StoreGate {
    /// Create a gate admitting `max_concurrent` analyses at once.
    pub fn new(max_concurrent: usize, acquire_timeout: Duration, statement_timeout: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            acquire_timeout,
            statement_timeout,
        }
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Configured number of permits.
    pub fn capacity(&self) -> usize {
        self.max_concurrent
    }

    /// Run `work` against the store under a permit.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::Store`] when no permit frees up within the
    /// acquire timeout, when the work outlives the statement timeout, or
    /// when it panics. Errors from `work` itself pass through unchanged.
    pub async fn run<T, F>(&self, store: Arc<SpatialStore>, work: F) -> Result<T>
    where
        F: FnOnce(&SpatialStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = tokio::time::timeout(self.acquire_timeout, self.permits.clone().acquire_owned())
            .await
            .map_err(|_| {
                HazardError::Store(format!(
                    "no store connection available within {} ms",
                    self.acquire_timeout.as_millis()
                ))
            })?
            .map_err(|_| HazardError::Store("store gate is closed".to_string()))?;

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work(&store)
        });

        match tokio::time::timeout(self.statement_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(HazardError::Store(format!("analysis task failed: {e}"))),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.statement_timeout.as_millis() as u64,
                    "Analysis exceeded statement timeout"
                );
                Err(HazardError::Store(format!(
                    "analysis did not finish within {} ms",
                    self.statement_timeout.as_millis()
                )))
            }
        }
    }
}
