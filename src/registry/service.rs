//! Service Registry
//!
//! Registrations live in a plain map; healthy lookups are cached in an
//! `ExpiringCache` and refreshed through `retry_with_backoff` + `with_timeout`.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::ExpiringCache;
use crate::config::Config;
use crate::error::ResilienceError;
use crate::resilience::{with_timeout, RetryPolicy};

// == Service Instance ==
/// A registered service endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceInstance {
    pub name: String,
    pub address: String,
    pub registered_at: DateTime<Utc>,
}

// == Registry Error ==
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Unknown service: {0}")]
    UnknownService(String),

    /// Every probe attempt failed; `reason` is the last attempt's error
    #[error("Service {name} is unhealthy: {reason}")]
    Unhealthy { name: String, reason: String },
}

// == Service Registry ==
/// Registry whose lookups return only instances that recently passed a probe.
#[derive(Debug)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, ServiceInstance>>,
    healthy: ExpiringCache<String, ServiceInstance>,
    retry: RetryPolicy,
    probe_timeout: Duration,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    ///
    /// # Arguments
    /// * `healthy_ttl` - How long a passed probe is trusted
    /// * `cleanup_interval` - Advisory sweep period for the healthy cache
    /// * `retry` - Policy for re-running a failing probe
    /// * `probe_timeout` - Bound on each individual probe attempt
    pub fn new(
        healthy_ttl: Duration,
        cleanup_interval: Duration,
        retry: RetryPolicy,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            healthy: ExpiringCache::new(healthy_ttl, cleanup_interval),
            retry,
            probe_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ResilienceError> {
        Ok(Self::new(
            Duration::from_secs(config.registry_ttl),
            Duration::from_secs(config.cleanup_interval),
            RetryPolicy::from_config(config)?,
            Duration::from_millis(config.probe_timeout_ms),
        ))
    }

    // == Register ==
    /// Registers or replaces `name`. A replaced instance loses its cached
    /// health status.
    pub fn register(&self, name: impl Into<String>, address: impl Into<String>) -> ServiceInstance {
        let instance = ServiceInstance {
            name: name.into(),
            address: address.into(),
            registered_at: Utc::now(),
        };

        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(instance.name.clone(), instance.clone());
        self.healthy.remove(&instance.name);

        info!("Registered service {} at {}", instance.name, instance.address);
        instance
    }

    // == Deregister ==
    pub fn deregister(&self, name: &str) -> Option<ServiceInstance> {
        let removed = self
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        self.healthy.remove(name);

        if removed.is_some() {
            info!("Deregistered service {}", name);
        }
        removed
    }

    /// Returns every registration, sorted by name.
    pub fn services(&self) -> Vec<ServiceInstance> {
        let mut services: Vec<ServiceInstance> = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }

    /// Cache of instances that recently passed a probe.
    pub fn healthy_cache(&self) -> &ExpiringCache<String, ServiceInstance> {
        &self.healthy
    }

    fn current(&self, name: &str) -> Option<ServiceInstance> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    // == Lookup ==
    /// Returns a healthy instance of `name`.
    ///
    /// A cached healthy answer is returned without probing. Otherwise `probe`
    /// runs under the retry policy, each attempt bounded by the probe
    /// timeout; a passing instance is cached for the healthy TTL.
    ///
    /// A registration replaced while its probe was running is not cached;
    /// the replacement is probed instead. A service deregistered meanwhile
    /// yields `UnknownService`.
    pub async fn lookup<P, Fut, E>(&self, name: &str, probe: P) -> Result<ServiceInstance, RegistryError>
    where
        P: Fn(ServiceInstance) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        if let Some(instance) = self.healthy.get(name) {
            debug!("Service {} served from health cache", name);
            return Ok(instance);
        }

        let mut instance = self
            .current(name)
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))?;

        loop {
            if let Err(reason) = self.probe_instance(&instance, &probe).await {
                warn!("Service {} failed health probe: {}", name, reason);
                return Err(RegistryError::Unhealthy {
                    name: name.to_string(),
                    reason,
                });
            }

            // Holding the read lock keeps register/deregister from
            // interleaving between the check and the cache write.
            let replacement = {
                let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
                match services.get(name) {
                    Some(current) if *current == instance => {
                        self.healthy.put(name.to_string(), instance.clone());
                        None
                    }
                    Some(current) => Some(current.clone()),
                    None => return Err(RegistryError::UnknownService(name.to_string())),
                }
            };

            match replacement {
                None => {
                    debug!("Service {} passed health probe", name);
                    return Ok(instance);
                }
                Some(current) => {
                    debug!("Service {} was re-registered while being checked", name);
                    instance = current;
                }
            }
        }
    }

    /// Runs `probe` against `instance` under the retry policy and timeout.
    async fn probe_instance<P, Fut, E>(&self, instance: &ServiceInstance, probe: &P) -> Result<(), String>
    where
        P: Fn(ServiceInstance) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let probe_timeout = self.probe_timeout;
        self.retry
            .run(|| {
                let attempt = probe(instance.clone());
                async move {
                    match with_timeout(probe_timeout, attempt).await {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(error)) => Err(error.to_string()),
                        Err(timeout) => Err(timeout.to_string()),
                    }
                }
            })
            .await
    }
}
