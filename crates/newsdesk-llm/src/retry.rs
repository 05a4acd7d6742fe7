//! Retry with capped exponential back-off.
//!
//! [`execute`] wraps any fallible async operation. The caller supplies the
//! [`RetryPolicy`] and a predicate that classifies each error: retriable
//! errors are retried until the attempt budget runs out, anything else is
//! returned immediately as [`RetryError::Fatal`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Attempt budget and back-off bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps; for tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Sleep before retry number `retry` (0-indexed): `min(base * 2^retry, max)`.
    ///
    /// | retry | delay with base = 1 s, max = 30 s |
    /// |-------|-----------------------------------|
    /// | 0     | 1 s                               |
    /// | 1     | 2 s                               |
    /// | 2     | 4 s                               |
    /// | 5     | 30 s (capped)                     |
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << retry.min(31))
            .min(self.max_delay)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The error was classified as non-retriable; no further attempts were made.
    #[error(transparent)]
    Fatal(E),

    /// Every attempt failed with a retriable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Number of attempts that were made before giving up.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Fatal(_) => 1,
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Runs `operation` until it succeeds, fails fatally, or exhausts `policy`.
///
/// Each retry logs the attempt number and the computed delay.
///
/// # Errors
///
/// - [`RetryError::Fatal`] as soon as `is_retriable` returns `false`.
/// - [`RetryError::Exhausted`] after `policy.max_attempts` retriable failures.
pub async fn execute<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_retriable: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) {
                    return Err(RetryError::Fatal(err));
                }
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                let delay = policy.delay_for(attempt - 1);
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "transient error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
