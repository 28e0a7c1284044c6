//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::cache::ExpiringCache;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    CleanupResponse, ClearResponse, DeleteResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};
use crate::resilience::timeout_or_default_blocking;

/// Cache type served over HTTP
pub type StringCache = ExpiringCache<String, String>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache; locking happens inside the cache
    pub cache: Arc<StringCache>,
    /// Bound on the health self-probe
    pub probe_timeout: Duration,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: StringCache) -> Self {
        Self {
            cache: Arc::new(cache),
            probe_timeout: Duration::from_millis(Config::default().probe_timeout_ms),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache: Arc::new(ExpiringCache::from_config(config)),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl_duration().unwrap_or_else(|| state.cache.default_ttl());
    state.cache.put_with_ttl(req.key.clone(), req.value, ttl);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Expired entries are evicted by the lookup and reported as not found.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .get(&key)
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
///
/// Idempotent: deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.cache.remove(&key);
    Json(DeleteResponse::new(key))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear();
    Json(ClearResponse::new())
}

/// Handler for POST /cleanup
///
/// Runs one expiry sweep immediately.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    let removed = state.cache.cleanup();
    Json(CleanupResponse { removed })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
///
/// Takes the cache lock on the blocking pool under the probe timeout; a lock
/// that cannot be acquired in time reports unhealthy with 503.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let cache = state.cache.clone();
    let healthy = timeout_or_default_blocking(state.probe_timeout, false, move || {
        cache.ping();
        Ok::<_, Infallible>(true)
    })
    .await;

    if healthy {
        (StatusCode::OK, Json(HealthResponse::healthy()))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse::unhealthy()))
    }
}
