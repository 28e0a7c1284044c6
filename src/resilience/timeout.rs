//! Timeout With Fallback
//!
//! Bounds an operation's running time and substitutes a fallback value when
//! it is too slow or fails.

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::error::ResilienceError;

/// Races `future` against a timer of length `timeout`.
///
/// On timeout the future is dropped, which cancels it at its next `.await`,
/// and `ResilienceError::Timeout` is returned.
pub async fn with_timeout<F>(timeout: Duration, future: F) -> Result<F::Output, ResilienceError>
where
    F: Future,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| ResilienceError::Timeout(timeout))
}

// == Timeout Or Default ==
/// Runs `operation` under a bound of `timeout`.
///
/// Returns the operation's value when it succeeds in time. A timeout and a
/// failure are treated alike: both yield `fallback`, and the failure is
/// neither logged nor propagated. Never fails.
pub async fn timeout_or_default<F, Fut, T, E>(timeout: Duration, fallback: T, operation: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match with_timeout(timeout, operation()).await {
        Ok(Ok(value)) => value,
        Ok(Err(_)) | Err(_) => fallback,
    }
}

/// Like [`timeout_or_default`] for a blocking closure.
///
/// The closure runs on tokio's blocking pool. Blocking work cannot be
/// interrupted, so on timeout the closure is abandoned rather than joined and
/// may keep running in the background until it returns.
pub async fn timeout_or_default_blocking<F, T, E>(timeout: Duration, fallback: T, operation: F) -> T
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(operation);
    match with_timeout(timeout, handle).await {
        Ok(Ok(Ok(value))) => value,
        _ => fallback,
    }
}

// == Timeout Policy ==
/// A reusable timeout bound paired with its fallback value.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy<T> {
    pub timeout: Duration,
    pub fallback: T,
}

impl<T: Clone> TimeoutPolicy<T> {
    pub fn new(timeout: Duration, fallback: T) -> Self {
        Self { timeout, fallback }
    }

    /// Uses `PROBE_TIMEOUT_MS` from `config` as the bound.
    pub fn from_config(config: &Config, fallback: T) -> Self {
        Self::new(Duration::from_millis(config.probe_timeout_ms), fallback)
    }

    pub async fn run<F, Fut, E>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        timeout_or_default(self.timeout, self.fallback.clone(), operation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_completes_within_bound() {
        let result = timeout_or_default(Duration::from_millis(500), "default", || async {
            sleep(Duration::from_millis(100)).await;
            Ok::<_, String>("real")
        })
        .await;

        assert_eq!(result, "real");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_yields_fallback() {
        let start = Instant::now();

        let result = timeout_or_default(Duration::from_millis(100), "default", || async {
            sleep(Duration::from_millis(500)).await;
            Ok::<_, String>("real")
        })
        .await;

        assert_eq!(result, "default");
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_yields_fallback() {
        let result = timeout_or_default(Duration::from_millis(1000), "default", || async {
            Err::<&str, _>("boom")
        })
        .await;

        assert_eq!(result, "default");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_operation_is_cancelled() {
        let finished = Arc::new(AtomicBool::new(false));

        let flag = finished.clone();
        let result = timeout_or_default(Duration::from_millis(100), 0, move || async move {
            sleep(Duration::from_millis(500)).await;
            flag.store(true, Ordering::SeqCst);
            Ok::<_, String>(1)
        })
        .await;
        assert_eq!(result, 0);

        sleep(Duration::from_secs(1)).await;
        assert!(!finished.load(Ordering::SeqCst), "Dropped future must not resume");
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_reports_timeout() {
        let result = with_timeout(Duration::from_millis(50), sleep(Duration::from_secs(1))).await;
        assert_eq!(result, Err(ResilienceError::Timeout(Duration::from_millis(50))));

        let result = with_timeout(Duration::from_millis(50), async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_reuses_fallback() {
        let policy = TimeoutPolicy::new(Duration::from_millis(100), "fallback".to_string());

        let first = policy
            .run(|| async { Err::<String, _>("nope") })
            .await;
        let second = policy
            .run(|| async { Ok::<_, String>("ok".to_string()) })
            .await;

        assert_eq!(first, "fallback");
        assert_eq!(second, "ok");
    }

    #[test]
    fn test_policy_from_config() {
        let policy = TimeoutPolicy::from_config(&Config::default(), false);
        assert_eq!(policy.timeout, Duration::from_millis(1000));
        assert!(!policy.fallback);
    }

    #[tokio::test]
    async fn test_blocking_within_bound() {
        let result =
            timeout_or_default_blocking(Duration::from_secs(5), 0, || Ok::<_, String>(42)).await;
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_blocking_timeout_abandons_closure() {
        let result = timeout_or_default_blocking(Duration::from_millis(20), "default", || {
            std::thread::sleep(Duration::from_millis(300));
            Ok::<_, String>("real")
        })
        .await;

        assert_eq!(result, "default");
    }

    #[tokio::test]
    async fn test_blocking_failure_yields_fallback() {
        let result =
            timeout_or_default_blocking(Duration::from_secs(5), 1, || Err::<i32, _>("bad")).await;
        assert_eq!(result, 1);
    }
}
