//! Catalog listing cache.
//!
//! A single cache entry mirrors the full product listing for a fixed TTL. The
//! cache is never a source of truth: the coordinator in
//! [`crate::application::catalog`] decides when to read, fill or drop it.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"      # memory | redis | disabled
//! redis_url = "redis://127.0.0.1:6379/0"
//! ttl_seconds = 300
//! reconcile = "invalidate" # invalidate | refresh
//! op_timeout_ms = 500
//! ```

mod config;
mod error;
mod listing;
mod lock;
mod memory;
mod redis_cache;

use std::sync::Arc;

pub use config::{CACHE_OP_TIMEOUT, CacheBackend, CacheConfig, LISTING_TTL, ReconcileStrategy};
pub use error::CacheError;
pub use listing::{
    ListingCache, NoopListingCache, PRODUCTS_CACHE_KEY, decode_listing, encode_listing,
};
pub use memory::MemoryListingCache;
pub use redis_cache::RedisListingCache;

/// Build the cache selected by `config`.
pub async fn connect(config: &CacheConfig) -> Result<Arc<dyn ListingCache>, CacheError> {
    let cache: Arc<dyn ListingCache> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryListingCache::new()),
        CacheBackend::Disabled => Arc::new(NoopListingCache),
        CacheBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                CacheError::Unavailable("redis backend selected without a redis url".to_string())
            })?;
            Arc::new(RedisListingCache::connect(url, config.op_timeout).await?)
        }
    };
    Ok(cache)
}
