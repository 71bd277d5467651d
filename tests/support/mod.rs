//! In-memory collaborators for exercising the catalog coordinator without Postgres or Redis.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;

use catalog::application::catalog::CatalogService;
use catalog::application::repos::{ProductsRepo, ProductsWriteRepo, RepoError};
use catalog::cache::{CacheError, ListingCache, ReconcileStrategy, decode_listing, encode_listing};
use catalog::domain::products::{NewProduct, Product, ProductChanges, ProductDraft, ProductId};

const EPOCH: OffsetDateTime = datetime!(2024-05-01 09:00:00 UTC);

#[derive(Default)]
struct StoreState {
    next_id: ProductId,
    products: Vec<Product>,
    clock_ticks: i64,
}

/// Product store backed by a vector, ordered like the Postgres adapter.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    pub list_calls: AtomicUsize,
    pub find_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    /// When set, every store call parks forever.
    pub stall: AtomicBool,
    /// When set, only reads park forever; writes still commit.
    pub stall_reads: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current listing as the store sees it, without counting as a call.
    pub fn snapshot(&self) -> Vec<Product> {
        let state = self.state.lock().expect("store lock");
        ordered(&state.products)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, failing: &AtomicBool) -> Result<(), RepoError> {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection reset by peer"));
        }
        Ok(())
    }

    async fn enter_read(&self) -> Result<(), RepoError> {
        if self.stall_reads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.enter(&self.fail_reads).await
    }
}

fn ordered(products: &[Product]) -> Vec<Product> {
    let mut listing = products.to_vec();
    listing.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    listing
}

fn tick(state: &mut StoreState) -> OffsetDateTime {
    state.clock_ticks += 1;
    EPOCH + time::Duration::seconds(state.clock_ticks)
}

#[async_trait]
impl ProductsRepo for InMemoryStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepoError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.enter_read().await?;
        let state = self.state.lock().expect("store lock");
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.enter_read().await?;
        Ok(self.snapshot())
    }
}

#[async_trait]
impl ProductsWriteRepo for InMemoryStore {
    async fn create_product(&self, params: NewProduct) -> Result<Product, RepoError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(&self.fail_writes).await?;
        let mut state = self.state.lock().expect("store lock");
        state.next_id += 1;
        let now = tick(&mut state);
        let product = Product {
            id: state.next_id,
            name: params.name,
            description: params.description,
            price: params.price,
            stock: params.stock,
            category: params.category,
            image_url: params.image_url,
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<(), RepoError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(&self.fail_writes).await?;
        let mut state = self.state.lock().expect("store lock");
        let now = tick(&mut state);
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = description;
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(stock) = changes.stock {
            product.stock = stock;
        }
        if let Some(category) = changes.category {
            product.category = Some(category);
        }
        if let Some(image_url) = changes.image_url {
            product.image_url = Some(image_url);
        }
        product.updated_at = now;
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepoError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(&self.fail_writes).await?;
        let mut state = self.state.lock().expect("store lock");
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        if state.products.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// Listing cache whose every operation can be made to fail or hang, with call counters.
///
/// Stores encoded bytes like the real adapters, so a hit returns a decoded snapshot.
#[derive(Default)]
pub struct ScriptedCache {
    slot: Mutex<Option<Vec<u8>>>,
    pub get_calls: AtomicUsize,
    pub set_calls: AtomicUsize,
    pub invalidate_calls: AtomicUsize,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_invalidate: AtomicBool,
    /// When set, `set_listing` and `invalidate` park forever.
    pub stall_writes: AtomicBool,
    /// When set, `get_listing` parks forever.
    pub stall_reads: AtomicBool,
    pub last_ttl: Mutex<Option<Duration>>,
}

impl ScriptedCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let cache = Self::default();
        cache.fail_get.store(true, Ordering::SeqCst);
        cache.fail_set.store(true, Ordering::SeqCst);
        cache.fail_invalidate.store(true, Ordering::SeqCst);
        Arc::new(cache)
    }

    pub fn stored(&self) -> Option<Vec<Product>> {
        let slot = self.slot.lock().expect("cache lock");
        slot.as_deref()
            .map(|payload| decode_listing(payload).expect("stored payload decodes"))
    }

    pub fn store_raw(&self, payload: &[u8]) {
        *self.slot.lock().expect("cache lock") = Some(payload.to_vec());
    }

    pub fn invalidate_calls(&self) -> usize {
        self.invalidate_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingCache for ScriptedCache {
    fn backend(&self) -> &'static str {
        "scripted"
    }

    async fn get_listing(&self) -> Result<Option<Vec<Product>>, CacheError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_reads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".to_string()));
        }
        let payload = self.slot.lock().expect("cache lock").clone();
        payload.map(|bytes| decode_listing(&bytes)).transpose()
    }

    async fn set_listing(&self, products: &[Product], ttl: Duration) -> Result<(), CacheError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".to_string()));
        }
        let payload = encode_listing(products)?;
        *self.slot.lock().expect("cache lock") = Some(payload);
        *self.last_ttl.lock().expect("ttl lock") = Some(ttl);
        Ok(())
    }

    async fn invalidate(&self) -> Result<(), CacheError> {
        self.invalidate_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_invalidate.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".to_string()));
        }
        *self.slot.lock().expect("cache lock") = None;
        Ok(())
    }
}

pub fn catalog_with(
    store: &Arc<InMemoryStore>,
    cache: &Arc<ScriptedCache>,
    strategy: ReconcileStrategy,
) -> CatalogService {
    let reader: Arc<dyn ProductsRepo> = store.clone();
    let writer: Arc<dyn ProductsWriteRepo> = store.clone();
    let listing: Arc<dyn ListingCache> = cache.clone();
    CatalogService::new(reader, writer, listing).with_strategy(strategy)
}

pub fn draft(name: &str, price: f64, stock: i64) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        price,
        stock,
        ..Default::default()
    }
}
