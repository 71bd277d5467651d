//! Catalog coordinator: keeps the listing cache consistent with the product store.
//!
//! Reads of the full listing go cache-aside: a non-empty cached listing is
//! returned as is, anything else (miss, empty listing, cache failure) falls
//! through to the store and the fresh result is written back. Point reads
//! always hit the store. Writes commit to the store first and only then
//! reconcile the cache with the configured [`ReconcileStrategy`].
//!
//! Cache failures never change the outcome of a call. Every cache round trip is
//! bounded by its own timeout, so a hung cache costs latency and a counted cache
//! error, never the caller's deadline. A store failure is always surfaced and
//! leaves the cache untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::application::context::{CallContext, Interrupted};
use crate::application::repos::{ProductsRepo, ProductsWriteRepo, RepoError};
use crate::cache::{CACHE_OP_TIMEOUT, CacheError, LISTING_TTL, ListingCache, ReconcileStrategy};
use crate::domain::error::DomainError;
use crate::domain::products::{Product, ProductDraft, ProductId, ProductPatch};

pub const METRIC_LISTING_CACHE_HIT: &str = "catalog_listing_cache_hit_total";
pub const METRIC_LISTING_CACHE_MISS: &str = "catalog_listing_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "catalog_cache_error_total";
pub const METRIC_CACHE_RECONCILE_MS: &str = "catalog_cache_reconcile_ms";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    NotFound,
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("product store failed: {0}")]
    Store(#[source] RepoError),
    #[error("call interrupted before the store answered ({0:?})")]
    Cancelled(Interrupted),
}

impl From<RepoError> for CatalogError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => CatalogError::NotFound,
            other => CatalogError::Store(other),
        }
    }
}

/// Where a listing was served from. Diagnostic only; the data is the same either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    Cache,
    Store,
}

impl ListingSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingSource::Cache => "cache",
            ListingSource::Store => "store",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductListing {
    pub products: Vec<Product>,
    pub source: ListingSource,
}

impl ProductListing {
    pub fn served_from_cache(&self) -> bool {
        self.source == ListingSource::Cache
    }
}

#[derive(Debug, Error)]
enum ReconcileFailure {
    #[error("{op} failed: {source}")]
    Cache {
        op: &'static str,
        source: CacheError,
    },
    #[error("listing refresh read failed: {0}")]
    Store(RepoError),
}

#[derive(Clone)]
pub struct CatalogService {
    reader: Arc<dyn ProductsRepo>,
    writer: Arc<dyn ProductsWriteRepo>,
    cache: Arc<dyn ListingCache>,
    strategy: ReconcileStrategy,
    ttl: Duration,
    cache_timeout: Duration,
}

impl CatalogService {
    pub fn new(
        reader: Arc<dyn ProductsRepo>,
        writer: Arc<dyn ProductsWriteRepo>,
        cache: Arc<dyn ListingCache>,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
            strategy: ReconcileStrategy::default(),
            ttl: LISTING_TTL,
            cache_timeout: CACHE_OP_TIMEOUT,
        }
    }

    pub fn with_strategy(mut self, strategy: ReconcileStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Full listing, from the cache when it holds a non-empty snapshot.
    #[instrument(skip_all, fields(cache = self.cache.backend()))]
    pub async fn list_products(&self, ctx: &CallContext) -> Result<ProductListing, CatalogError> {
        match ctx.guard(self.cache_step(self.cache.get_listing())).await {
            Ok(Ok(Some(products))) if !products.is_empty() => {
                counter!(METRIC_LISTING_CACHE_HIT).increment(1);
                debug!(count = products.len(), "Listing served from cache");
                return Ok(ProductListing {
                    products,
                    source: ListingSource::Cache,
                });
            }
            Ok(Ok(_)) => {}
            Ok(Err(err)) => self.record_cache_error("get_listing", &err),
            Err(reason) => return Err(CatalogError::Cancelled(reason)),
        }

        counter!(METRIC_LISTING_CACHE_MISS).increment(1);
        let products = self.store_step(ctx, self.reader.list_products()).await?;
        self.populate(ctx, &products).await;

        debug!(count = products.len(), "Listing served from store");
        Ok(ProductListing {
            products,
            source: ListingSource::Store,
        })
    }

    /// Point read. Never cached.
    #[instrument(skip(self, ctx))]
    pub async fn get_product(
        &self,
        ctx: &CallContext,
        id: ProductId,
    ) -> Result<Product, CatalogError> {
        self.store_step(ctx, self.reader.find_product(id))
            .await?
            .ok_or(CatalogError::NotFound)
    }

    #[instrument(skip_all)]
    pub async fn create_product(
        &self,
        ctx: &CallContext,
        draft: ProductDraft,
    ) -> Result<Product, CatalogError> {
        let params = draft.validate()?;
        let product = self
            .store_step(ctx, self.writer.create_product(params))
            .await?;
        info!(product_id = product.id, "Product created");

        self.reconcile(ctx, "create").await;
        Ok(product)
    }

    /// Patch semantics: fields absent from `patch` keep their stored value.
    #[instrument(skip(self, ctx, patch))]
    pub async fn update_product(
        &self,
        ctx: &CallContext,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<(), CatalogError> {
        let changes = patch.validate()?;
        self.store_step(ctx, self.writer.update_product(id, changes))
            .await?;
        info!(product_id = id, "Product updated");

        self.reconcile(ctx, "update").await;
        Ok(())
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_product(&self, ctx: &CallContext, id: ProductId) -> Result<(), CatalogError> {
        self.store_step(ctx, self.writer.delete_product(id)).await?;
        info!(product_id = id, "Product deleted");

        self.reconcile(ctx, "delete").await;
        Ok(())
    }

    async fn store_step<T>(
        &self,
        ctx: &CallContext,
        step: impl Future<Output = Result<T, RepoError>>,
    ) -> Result<T, CatalogError> {
        ctx.guard(step)
            .await
            .map_err(CatalogError::Cancelled)?
            .map_err(CatalogError::from)
    }

    /// Bound one cache round trip; running out of time is a cache failure like any other.
    async fn cache_step<T>(
        &self,
        step: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.cache_timeout, step)
            .await
            .unwrap_or_else(|_elapsed| Err(CacheError::Timeout(self.cache_timeout)))
    }

    async fn populate(&self, ctx: &CallContext, products: &[Product]) {
        match ctx
            .guard(self.cache_step(self.cache.set_listing(products, self.ttl)))
            .await
        {
            Ok(Ok(())) => debug!(count = products.len(), "Listing cache populated"),
            Ok(Err(err)) => self.record_cache_error("set_listing", &err),
            Err(reason) => warn!(?reason, "Listing cache population abandoned"),
        }
    }

    /// Bring the cache in line after a committed write. Failures are logged and absorbed.
    async fn reconcile(&self, ctx: &CallContext, trigger: &'static str) {
        let started_at = Instant::now();
        let result = match self.strategy {
            ReconcileStrategy::Invalidate => {
                ctx.guard(async {
                    self.cache_step(self.cache.invalidate())
                        .await
                        .map_err(|source| ReconcileFailure::Cache {
                            op: "invalidate",
                            source,
                        })
                })
                .await
            }
            ReconcileStrategy::Refresh => ctx.guard(self.refresh_listing()).await,
        };
        histogram!(METRIC_CACHE_RECONCILE_MS, "strategy" => self.strategy.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(Ok(())) => debug!(trigger, strategy = %self.strategy, "Listing cache reconciled"),
            Ok(Err(ReconcileFailure::Cache { op, source })) => {
                self.record_cache_error(op, &source);
            }
            Ok(Err(err @ ReconcileFailure::Store(_))) => warn!(
                trigger,
                error = %err,
                "Listing refresh skipped; cached listing dropped instead"
            ),
            Err(reason) => {
                warn!(
                    trigger,
                    strategy = %self.strategy,
                    ?reason,
                    "Listing cache reconciliation abandoned; dropping cached listing"
                );
                self.drop_stale_listing().await;
            }
        }
    }

    /// Re-read and republish the listing. When the new listing cannot be
    /// published, the pre-write snapshot is dropped instead.
    async fn refresh_listing(&self) -> Result<(), ReconcileFailure> {
        let products = match self.reader.list_products().await {
            Ok(products) => products,
            Err(err) => {
                self.drop_stale_listing().await;
                return Err(ReconcileFailure::Store(err));
            }
        };
        match self
            .cache_step(self.cache.set_listing(&products, self.ttl))
            .await
        {
            Ok(()) => Ok(()),
            Err(source) => {
                self.drop_stale_listing().await;
                Err(ReconcileFailure::Cache {
                    op: "set_listing",
                    source,
                })
            }
        }
    }

    /// Best-effort invalidation bounded by the cache timeout.
    async fn drop_stale_listing(&self) {
        if let Err(err) = self.cache_step(self.cache.invalidate()).await {
            self.record_cache_error("invalidate", &err);
        }
    }

    fn record_cache_error(&self, op: &'static str, err: &CacheError) {
        counter!(METRIC_CACHE_ERROR, "op" => op).increment(1);
        warn!(
            backend = self.cache.backend(),
            op,
            error = %err,
            "Listing cache operation failed; continuing without it"
        );
    }
}
