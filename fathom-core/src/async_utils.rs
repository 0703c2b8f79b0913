//! Async primitives for the research traversal
//!
//! The limiter is the single shared mutable resource in the whole system:
//! one semaphore gating every external call, at every recursion level.

use crate::error::{FathomError, FathomResult};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Process-wide bound on in-flight external calls.
///
/// Every harvest and LLM call holds one permit for exactly the duration of
/// the call. Permits are RAII guards and must be dropped before recursing,
/// otherwise a deep tree could starve itself.
#[derive(Debug, Clone)]
pub struct Limiter {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl Limiter {
    /// Create a limiter with the given capacity (floored at 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> FathomResult<LimiterGuard> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| FathomError::service(format!("Failed to acquire limiter permit: {}", e)))?;

        Ok(LimiterGuard { _permit: permit })
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// RAII guard for limiter permits
pub struct LimiterGuard {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

/// Timeout wrapper for external calls.
///
/// Elapsing maps to `FathomError::Timeout`; the inner result passes through
/// otherwise.
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> FathomResult<T>
where
    F: std::future::Future<Output = FathomResult<T>>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => result,
        Err(_) => {
            debug!(
                operation = operation_name,
                timeout_ms = timeout_ms,
                "Operation exceeded its deadline"
            );
            Err(FathomError::timeout(operation_name, timeout_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn limiter_bounds_in_flight_tasks() {
        let limiter = Limiter::new(2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            let in_flight = Arc::clone(&in_flight);
            let high_water = Arc::clone(&high_water);
            handles.push(tokio::spawn(async move {
                let _guard = limiter.acquire().await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(high_water.load(Ordering::SeqCst) <= 2);
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test]
    async fn capacity_is_floored_at_one() {
        let limiter = Limiter::new(0);
        assert_eq!(limiter.capacity(), 1);
        let _guard = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test]
    async fn with_timeout_maps_elapse_to_timeout_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, FathomError>(42)
        };
        let result = with_timeout(slow, 10, "slow_op").await;
        assert!(matches!(result, Err(FathomError::Timeout { .. })));

        let fast = async { Ok::<_, FathomError>(42) };
        let result = with_timeout(fast, 100, "fast_op").await;
        assert_eq!(result.unwrap(), 42);
    }
}
