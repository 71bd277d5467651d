//! Cache configuration.
//!
//! Selects the listing cache backend, its freshness window and the post-write
//! reconciliation strategy via `[cache]` in `catalog.toml`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Freshness window of the cached product listing.
pub const LISTING_TTL: Duration = Duration::from_secs(300);

/// Default bound on one cache round trip. Kept well below the request timeout.
pub const CACHE_OP_TIMEOUT: Duration = Duration::from_millis(500);

/// Where the product listing is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-process slot, lost on restart and not shared between replicas.
    Memory,
    /// Shared Redis instance.
    Redis,
    /// Always miss; every listing read goes to the store.
    Disabled,
}

impl CacheBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
            CacheBackend::Disabled => "disabled",
        }
    }
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            "disabled" | "none" | "off" => Ok(CacheBackend::Disabled),
            other => Err(format!(
                "unknown cache backend `{other}` (expected memory, redis or disabled)"
            )),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the listing cache is reconciled after a successful write.
///
/// Fixed for the lifetime of a deployment; the two strategies are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Drop the cached listing; the next read repopulates it.
    #[default]
    Invalidate,
    /// Re-read the full listing from the store and republish it immediately.
    Refresh,
}

impl ReconcileStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ReconcileStrategy::Invalidate => "invalidate",
            ReconcileStrategy::Refresh => "refresh",
        }
    }
}

impl FromStr for ReconcileStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "invalidate" | "invalidate_only" => Ok(ReconcileStrategy::Invalidate),
            "refresh" | "eager_refresh" => Ok(ReconcileStrategy::Refresh),
            other => Err(format!(
                "unknown reconcile strategy `{other}` (expected invalidate or refresh)"
            )),
        }
    }
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Required when `backend` is [`CacheBackend::Redis`].
    pub redis_url: Option<String>,
    pub ttl: Duration,
    pub reconcile: ReconcileStrategy,
    pub op_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            ttl: LISTING_TTL,
            reconcile: ReconcileStrategy::default(),
            op_timeout: CACHE_OP_TIMEOUT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            ttl: settings.ttl,
            reconcile: settings.reconcile,
            op_timeout: settings.op_timeout,
        }
    }
}
