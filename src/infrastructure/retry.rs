//! Cancellable sleeps and retry with backoff for transient remote failures.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::errors::{DomainResult, LifecycleError};

/// Sleep for `duration` unless `cancel` fires first.
///
/// Cancellation always surfaces as [`LifecycleError::Cancelled`].
pub async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> DomainResult<()> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(LifecycleError::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Fail fast when `cancel` has already fired.
pub fn ensure_not_cancelled(cancel: &CancellationToken) -> DomainResult<()> {
    if cancel.is_cancelled() {
        Err(LifecycleError::Cancelled)
    } else {
        Ok(())
    }
}

/// Retry policy for transient remote failures
///
/// Only errors for which [`LifecycleError::is_transient`] holds are retried.
/// Backoff either doubles from `initial_backoff` up to `max_backoff`, or
/// stays constant.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    exponential: bool,
}

impl RetryPolicy {
    /// Exponential backoff: `initial`, `2 * initial`, ... capped at `max`.
    pub fn exponential(max_retries: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff: initial,
            max_backoff: max.max(initial),
            exponential: true,
        }
    }

    /// Constant delay between attempts.
    pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff: delay,
            max_backoff: delay,
            exponential: false,
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff before retry number `attempt` (zero-based).
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.initial_backoff;
        }
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Execute an operation, retrying transient failures.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> DomainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        self.execute_cancellable(&CancellationToken::new(), operation)
            .await
    }

    /// Execute an operation, retrying transient failures until `cancel` fires.
    pub async fn execute_cancellable<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> DomainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let mut attempt = 0;

        loop {
            ensure_not_cancelled(cancel)?;

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "operation succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    cancellable_sleep(backoff, cancel).await?;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 0 {
                        warn!(attempts = attempt + 1, error = %err, "operation failed after retries");
                    }
                    return Err(err);
                }
            }
        }
    }
}
