use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::catalog::CatalogService;
use crate::application::context::CallContext;
use crate::infra::db::PostgresRepositories;

/// Liveness check for the backing store, used by `/health`.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn check(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl StoreHealth for PostgresRepositories {
    async fn check(&self) -> Result<(), sqlx::Error> {
        self.health_check().await
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<CatalogService>,
    pub store_health: Arc<dyn StoreHealth>,
    pub request_timeout: Duration,
}

impl ApiState {
    pub fn call_context(&self) -> CallContext {
        CallContext::with_timeout(self.request_timeout)
    }
}
