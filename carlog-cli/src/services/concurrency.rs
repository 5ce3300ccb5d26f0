//! Concurrency limiter for store writes during import
//!
//! Bounds how many row operations are in flight against the record store at
//! once so a large spreadsheet does not open hundreds of concurrent writes.

use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Semaphore-based limiter for concurrent row operations
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    rows_acquired: Arc<AtomicU64>,
    rows_waited: Arc<AtomicU64>,
}

impl ConcurrencyLimiter {
    /// Limiter allowing `max_concurrent` operations at once (at least one)
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            rows_acquired: Arc::new(AtomicU64::new(0)),
            rows_waited: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait for a permit; released when the returned permit is dropped
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        if self.available_permits() == 0 {
            self.rows_waited.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Concurrency limiter: waiting for permit ({} in use)",
                self.max_concurrent
            );
        }

        let permit = self.semaphore.clone().acquire_owned().await?;
        self.rows_acquired.fetch_add(1, Ordering::Relaxed);
        Ok(permit)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn stats(&self) -> ConcurrencyStats {
        ConcurrencyStats {
            rows_acquired: self.rows_acquired.load(Ordering::Relaxed),
            rows_waited: self.rows_waited.load(Ordering::Relaxed),
        }
    }
}

/// Statistics for the concurrency limiter
#[derive(Debug, Clone, PartialEq)]
pub struct ConcurrencyStats {
    /// Total permits acquired since creation
    pub rows_acquired: u64,
    /// Times an operation had to wait for a permit
    pub rows_waited: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limiter_max_permits() {
        let limiter = ConcurrencyLimiter::new(3);

        let _p1 = limiter.acquire().await.unwrap();
        let _p2 = limiter.acquire().await.unwrap();
        let _p3 = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available_permits(), 0);

        let fourth =
            tokio::time::timeout(tokio::time::Duration::from_millis(20), limiter.acquire()).await;
        assert!(fourth.is_err());
        assert_eq!(limiter.stats().rows_acquired, 3);
    }

    #[tokio::test]
    async fn test_limiter_zero_means_one() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.max_concurrent(), 1);
        let _p = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available_permits(), 0);
    }

    #[tokio::test]
    async fn test_limiter_acquire_waits_for_release() {
        let limiter = ConcurrencyLimiter::new(1);
        let limiter_clone = limiter.clone();

        let permit = limiter.acquire().await.unwrap();
        let handle = tokio::spawn(async move { limiter_clone.acquire().await.is_ok() });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        drop(permit);

        let result = tokio::time::timeout(tokio::time::Duration::from_millis(100), handle).await;
        assert!(matches!(result, Ok(Ok(true))));

        let stats = limiter.stats();
        assert_eq!(stats.rows_acquired, 2);
        assert_eq!(stats.rows_waited, 1);
    }
}
