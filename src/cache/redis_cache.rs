//! Redis-backed listing cache.
//!
//! The listing lives under [`PRODUCTS_CACHE_KEY`] as a JSON document written
//! with `SET .. EX`, so Redis enforces the TTL. The connection is established
//! lazily: a Redis that is down at startup only costs cache misses until it
//! comes back. Connecting and every command are bounded by the configured
//! operation timeout, so an unresponsive server surfaces as a [`CacheError`].

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::domain::products::Product;

use super::error::CacheError;
use super::listing::{ListingCache, PRODUCTS_CACHE_KEY, decode_listing, encode_listing};

/// Reconnect attempts the manager makes before reporting a failure.
const RECONNECT_RETRIES: usize = 1;

pub struct RedisListingCache {
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
    key: String,
    op_timeout: Duration,
}

impl RedisListingCache {
    /// Parse `url` (`redis://host:port/db`) and try an initial `PING` bounded by `op_timeout`.
    ///
    /// Only an unparseable URL is an error; an unreachable server is logged and retried on use.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|err| CacheError::Backend(format!("invalid redis url: {err}")))?;
        let cache = Self {
            client,
            manager: OnceCell::new(),
            key: PRODUCTS_CACHE_KEY.to_string(),
            op_timeout,
        };

        let ping = tokio::time::timeout(op_timeout, cache.ping())
            .await
            .unwrap_or(Err(CacheError::Timeout(op_timeout)));
        match ping {
            Ok(()) => {
                info!(backend = "redis", key = PRODUCTS_CACHE_KEY, "Connected to listing cache")
            }
            Err(err) => warn!(
                backend = "redis",
                error = %err,
                "Listing cache unreachable at startup; will retry on first use"
            ),
        }
        Ok(cache)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let () = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .manager
            .get_or_try_init(|| {
                let config = ConnectionManagerConfig::new()
                    .set_connection_timeout(self.op_timeout)
                    .set_response_timeout(self.op_timeout)
                    .set_number_of_retries(RECONNECT_RETRIES);
                ConnectionManager::new_with_config(self.client.clone(), config)
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl ListingCache for RedisListingCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get_listing(&self) -> Result<Option<Vec<Product>>, CacheError> {
        let mut conn = self.connection().await?;
        let payload: Option<Vec<u8>> = conn.get(&self.key).await?;
        match payload {
            Some(payload) => decode_listing(&payload).map(Some),
            None => {
                debug!(key = %self.key, "Listing not present in redis");
                Ok(None)
            }
        }
    }

    async fn set_listing(&self, products: &[Product], ttl: Duration) -> Result<(), CacheError> {
        let payload = encode_listing(products)?;
        // EX rejects zero, round sub-second TTLs up.
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(&self.key, payload, seconds).await?;
        Ok(())
    }

    async fn invalidate(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(&self.key).await?;
        Ok(())
    }
}
