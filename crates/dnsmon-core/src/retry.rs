//! Cancellable exponential-backoff retry
//!
//! [`RetryPolicy`] wraps any fallible async operation. It knows nothing about
//! what the operation does; DNS queries and notification delivery both go
//! through it.
//!
//! ```rust,ignore
//! let policy = RetryPolicy::new(3, Duration::from_millis(500));
//! let answer = policy.run(&cancel, || resolver.query(name, kind.clone())).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Shutdown fired while waiting between attempts
    #[error("operation cancelled during retry backoff")]
    Cancelled,

    /// Every attempt failed
    #[error("operation failed after {attempts} attempts: {source}")]
    Exhausted {
        /// Number of attempts made
        attempts: usize,
        /// Error returned by the final attempt
        #[source]
        source: E,
    },

    /// The operation returned an error the caller marked as not retryable
    #[error("operation failed on attempt {attempt} with a non-retryable error: {source}")]
    Permanent {
        /// Attempt that produced the error
        attempt: usize,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled)
    }

    /// Number of attempts made before giving up (0 when cancelled)
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Cancelled => 0,
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Permanent { attempt, .. } => *attempt,
        }
    }
}

/// Exponential backoff policy: `max_attempts` tries, doubling the delay after
/// every failure starting from `initial_delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    initial_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` below one is treated as one.
    pub fn new(max_attempts: usize, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Run `operation`, retrying every error
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.run_if(cancel, operation, |_| true).await
    }

    /// Run `operation`, retrying only errors for which `should_retry` is true
    ///
    /// The backoff wait races `cancel`; if it fires first the pending retry is
    /// discarded and [`RetryError::Cancelled`] is returned.
    pub async fn run_if<T, E, F, Fut, P>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
        should_retry: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !should_retry(&error) {
                debug!(attempt, error = %error, "Non-retryable failure");
                return Err(RetryError::Permanent {
                    attempt,
                    source: error,
                });
            }

            if attempt >= self.max_attempts {
                warn!(attempts = attempt, error = %error, "Operation failed, giving up");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    source: error,
                });
            }

            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "Cancelled during retry wait");
                    return Err(RetryError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            delay = delay.saturating_mul(2);
        }
    }
}
