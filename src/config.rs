//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Cache, resilience and server configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Cleanup task interval in seconds, at least 1
    pub cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Total invocations allowed by the retry policy
    pub retry_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub retry_initial_delay_ms: u64,
    /// Upper bound for retry delays, in milliseconds
    pub retry_max_delay_ms: u64,
    /// Multiplier applied to the delay after each retry
    pub retry_backoff_factor: f64,
    /// Bound on a single health probe, in milliseconds
    pub probe_timeout_ms: u64,
    /// TTL in seconds for healthy service lookups
    pub registry_ttl: u64,
}

/// Reads `key` and parses it, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1, minimum: 1)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `RETRY_ATTEMPTS` - Retry attempts (default: 3)
    /// - `RETRY_INITIAL_DELAY_MS` - First retry delay (default: 100)
    /// - `RETRY_MAX_DELAY_MS` - Retry delay cap (default: 1000)
    /// - `RETRY_BACKOFF_FACTOR` - Delay multiplier (default: 2.0)
    /// - `PROBE_TIMEOUT_MS` - Health probe bound (default: 1000)
    /// - `REGISTRY_TTL` - Healthy lookup TTL in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval).max(1),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            retry_attempts: env_or("RETRY_ATTEMPTS", defaults.retry_attempts),
            retry_initial_delay_ms: env_or(
                "RETRY_INITIAL_DELAY_MS",
                defaults.retry_initial_delay_ms,
            ),
            retry_max_delay_ms: env_or("RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms),
            retry_backoff_factor: env_or("RETRY_BACKOFF_FACTOR", defaults.retry_backoff_factor),
            probe_timeout_ms: env_or("PROBE_TIMEOUT_MS", defaults.probe_timeout_ms),
            registry_ttl: env_or("REGISTRY_TTL", defaults.registry_ttl),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            cleanup_interval: 1,
            server_port: 3000,
            retry_attempts: 3,
            retry_initial_delay_ms: 100,
            retry_max_delay_ms: 1000,
            retry_backoff_factor: 2.0,
            probe_timeout_ms: 1000,
            registry_ttl: 30,
        }
    }
}
