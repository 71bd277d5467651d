//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::products::{NewProduct, Product, ProductChanges, ProductId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Read side of the product store.
#[async_trait]
pub trait ProductsRepo: Send + Sync {
    /// Returns `Ok(None)` when no product carries `id`.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepoError>;

    /// Full listing, newest first (`created_at DESC, id DESC`).
    async fn list_products(&self) -> Result<Vec<Product>, RepoError>;
}

/// Write side of the product store.
///
/// `update_product` and `delete_product` report [`RepoError::NotFound`] when no row matched.
#[async_trait]
pub trait ProductsWriteRepo: Send + Sync {
    async fn create_product(&self, params: NewProduct) -> Result<Product, RepoError>;

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<(), RepoError>;

    async fn delete_product(&self, id: ProductId) -> Result<(), RepoError>;
}
