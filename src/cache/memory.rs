//! In-process listing cache.
//!
//! Holds a single encoded snapshot with an expiry instant. Readers decode the
//! stored bytes, so what comes back is exactly what was written.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::products::Product;

use super::error::CacheError;
use super::listing::{ListingCache, decode_listing, encode_listing};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memory";

struct Entry {
    payload: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
pub struct MemoryListingCache {
    slot: RwLock<Option<Entry>>,
}

impl MemoryListingCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingCache for MemoryListingCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_listing(&self) -> Result<Option<Vec<Product>>, CacheError> {
        let now = Instant::now();
        let payload = {
            let guard = rw_read(&self.slot, SOURCE, "get_listing");
            match guard.as_ref() {
                Some(entry) if entry.is_fresh(now) => Some(entry.payload.clone()),
                _ => None,
            }
        };

        match payload {
            Some(payload) => decode_listing(&payload).map(Some),
            None => {
                // Drop an expired entry so it does not linger until the next write.
                let mut guard = rw_write(&self.slot, SOURCE, "get_listing.expire");
                if guard.as_ref().is_some_and(|entry| !entry.is_fresh(now)) {
                    *guard = None;
                }
                Ok(None)
            }
        }
    }

    async fn set_listing(&self, products: &[Product], ttl: Duration) -> Result<(), CacheError> {
        let payload = encode_listing(products)?;
        let entry = Entry {
            payload,
            expires_at: Instant::now() + ttl,
        };
        *rw_write(&self.slot, SOURCE, "set_listing") = Some(entry);
        Ok(())
    }

    async fn invalidate(&self) -> Result<(), CacheError> {
        *rw_write(&self.slot, SOURCE, "invalidate") = None;
        Ok(())
    }
}
