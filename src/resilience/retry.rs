//! Retry With Backoff
//!
//! Re-invokes a fallible async operation with exponentially growing, capped
//! delays between attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ResilienceError, RetryError};

// == Retry Policy ==
/// Parameters for [`retry_with_backoff`].
///
/// Only constructible through [`RetryPolicy::new`], so `attempts` is always
/// at least 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    // == Constructor ==
    /// Validates and builds a policy.
    ///
    /// # Arguments
    /// * `attempts` - Total number of invocations, including the first
    /// * `initial_delay` - Wait before the first retry
    /// * `max_delay` - Upper bound for every later wait
    /// * `backoff_factor` - Multiplier applied to the wait after each retry
    ///
    /// # Errors
    /// `ResilienceError::InvalidArgument` when `attempts` is 0.
    pub fn new(
        attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_factor: f64,
    ) -> Result<Self, ResilienceError> {
        if attempts == 0 {
            return Err(ResilienceError::InvalidArgument(
                "attempts must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            attempts,
            initial_delay,
            max_delay,
            backoff_factor,
        })
    }

    /// Builds the policy described by the `RETRY_*` settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self, ResilienceError> {
        Self::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_initial_delay_ms),
            Duration::from_millis(config.retry_max_delay_ms),
            config.retry_backoff_factor,
        )
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    // == Next Delay ==
    /// Grows `current` by the backoff factor, clamped to `max_delay`.
    ///
    /// Products that are not a valid duration (overflow, NaN, negative
    /// factors) clamp to `max_delay` as well.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let grown = current.as_secs_f64() * self.backoff_factor;
        Duration::try_from_secs_f64(grown)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `operation` under this policy. See [`retry_with_backoff`].
    pub async fn run<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        retry_with_backoff(self, operation).await
    }
}

// == Retry With Backoff ==
/// Invokes `operation` up to `policy.attempts()` times.
///
/// Failures of every attempt but the last are logged and followed by a
/// non-blocking sleep of the current delay; the delay then grows by the
/// backoff factor up to `max_delay`. There is no delay before the first
/// attempt. The last attempt is unguarded: its error is returned as is.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut delay = policy.initial_delay;

    for attempt in 1..policy.attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("Operation succeeded on attempt {}", attempt);
                }
                return Ok(value);
            }
            Err(error) => {
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt, policy.attempts, error, delay
                );
                sleep(delay).await;
                delay = policy.next_delay(delay);
            }
        }
    }

    operation().await
}

/// Validates the parameters and runs [`retry_with_backoff`].
///
/// A zero `attempts` is reported as `RetryError::InvalidArgument` before
/// `operation` is ever invoked.
pub async fn retry<F, Fut, T, E>(
    attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let policy = RetryPolicy::new(attempts, initial_delay, max_delay, backoff_factor)
        .map_err(RetryError::InvalidArgument)?;

    retry_with_backoff(&policy, operation)
        .await
        .map_err(RetryError::Operation)
}
