//! ttl_cache - A concurrent expiring cache with resilience combinators
//!
//! Provides a TTL cache with lazy and batch expiry, retry with exponential
//! backoff, timeout with fallback, a health-checked service registry built on
//! both, and a small HTTP server over the cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod resilience;
pub mod tasks;

pub use api::AppState;
pub use cache::ExpiringCache;
pub use config::Config;
pub use error::{ResilienceError, RetryError};
pub use resilience::{retry, retry_with_backoff, timeout_or_default, RetryPolicy, TimeoutPolicy};
pub use tasks::spawn_cleanup_task;
