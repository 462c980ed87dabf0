//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::PolicyKind;

/// Cache and driver configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. The struct also deserializes from any serde format, so a host
/// application can embed it in its own configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Eviction policy
    pub policy: PolicyKind,
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Expiration in milliseconds for time-aware LRU, 0 = disabled
    pub expiration_ms: u64,
    /// Concurrent workers spawned by the driver binary
    pub workers: usize,
    /// Operations performed by each driver worker
    pub operations: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_POLICY` - lru, mru, fifo or tlru (default: lru)
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_EXPIRATION_MS` - Expiration in milliseconds (default: 0)
    /// - `DRIVER_WORKERS` - Driver worker count (default: 4)
    /// - `DRIVER_OPERATIONS` - Operations per driver worker (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            policy: env_or("CACHE_POLICY", defaults.policy),
            capacity: env_or("CACHE_CAPACITY", defaults.capacity),
            expiration_ms: env_or("CACHE_EXPIRATION_MS", defaults.expiration_ms),
            workers: env_or("DRIVER_WORKERS", defaults.workers),
            operations: env_or("DRIVER_OPERATIONS", defaults.operations),
        }
    }

    /// Expiration as a `Duration`.
    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expiration_ms)
    }
}

/// Parses an environment variable, falling back when unset or malformed.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Lru,
            capacity: 1000,
            expiration_ms: 0,
            workers: 4,
            operations: 10_000,
        }
    }
}
