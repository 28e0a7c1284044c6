//! Service Registry Module
//!
//! In-memory registry of service addresses. Lookups are health-checked with a
//! retried, time-bounded probe and the last healthy answer is cached under a
//! TTL.

mod service;

pub use service::{RegistryError, ServiceInstance, ServiceRegistry};
