//! Resilience Module
//!
//! Control-flow combinators for flaky operations: bounded retry with
//! exponential backoff, and timeout with a fallback value.

mod retry;
mod timeout;

pub use retry::{retry, retry_with_backoff, RetryPolicy};
pub use timeout::{timeout_or_default, timeout_or_default_blocking, with_timeout, TimeoutPolicy};
