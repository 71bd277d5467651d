//! The listing cache contract and its wire format.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::products::Product;

use super::error::CacheError;

/// The single logical key holding the full product listing.
pub const PRODUCTS_CACHE_KEY: &str = "products";

/// Volatile mirror of the full product listing under [`PRODUCTS_CACHE_KEY`].
///
/// Entries are only ever replaced or removed as a whole.
#[async_trait]
pub trait ListingCache: Send + Sync {
    /// Short backend label used in logs.
    fn backend(&self) -> &'static str;

    /// `Ok(None)` is a miss, including an entry whose TTL has elapsed.
    async fn get_listing(&self) -> Result<Option<Vec<Product>>, CacheError>;

    async fn set_listing(&self, products: &[Product], ttl: Duration) -> Result<(), CacheError>;

    async fn invalidate(&self) -> Result<(), CacheError>;
}

/// Serialize a listing into the JSON document stored in the cache.
pub fn encode_listing(products: &[Product]) -> Result<Vec<u8>, CacheError> {
    serde_json::to_vec(products).map_err(CacheError::from)
}

pub fn decode_listing(payload: &[u8]) -> Result<Vec<Product>, CacheError> {
    serde_json::from_slice(payload).map_err(CacheError::from)
}

/// Cache used when caching is disabled: every read misses, every write succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListingCache;

#[async_trait]
impl ListingCache for NoopListingCache {
    fn backend(&self) -> &'static str {
        "disabled"
    }

    async fn get_listing(&self) -> Result<Option<Vec<Product>>, CacheError> {
        Ok(None)
    }

    async fn set_listing(&self, _products: &[Product], _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn invalidate(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
