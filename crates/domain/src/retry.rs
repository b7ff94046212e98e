//! Bounded retry for optimistic concurrency conflicts.

use std::future::Future;
use std::time::Duration;

use crate::error::DomainError;

/// Upper bound for a single backoff sleep.
const MAX_DELAY: Duration = Duration::from_millis(200);

/// Re-runs an operation when it loses an optimistic write race.
///
/// Only [`DomainError::is_conflict`] failures are retried. The operation
/// must re-read its inputs on every attempt and must have written nothing
/// when it fails with a conflict.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles on each further attempt, up to 200ms.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-conflict error, or
    /// attempts are exhausted (reported as [`DomainError::Contention`]).
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.base_delay;

        for attempt in 1..=max_attempts {
            match op().await {
                Err(err) if err.is_conflict() => {
                    metrics::counter!("write_conflicts_total").increment(1);
                    tracing::debug!(attempt, "optimistic write conflict, retrying");
                    if attempt < max_attempts && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(MAX_DELAY);
                    }
                }
                other => return other,
            }
        }

        tracing::warn!(attempts = max_attempts, "giving up after repeated conflicts");
        Err(DomainError::Contention {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use common::DocumentId;
    use doc_store::{StoreError, Version};

    fn conflict() -> DomainError {
        DomainError::Store(StoreError::ConcurrencyConflict {
            collection: "carts".to_string(),
            id: DocumentId::new(),
            expected: Version::first(),
            actual: Version::new(2),
        })
    }

    #[tokio::test]
    async fn retries_conflicts_until_success() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(conflict())
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_other_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::default()
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DomainError::Contention { attempts: 0 })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_contention() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        };
        let result: Result<(), _> = policy.run(|| async { Err(conflict()) }).await;

        assert!(matches!(
            result,
            Err(DomainError::Contention { attempts: 3 })
        ));
    }
}
