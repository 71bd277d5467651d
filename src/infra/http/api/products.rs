//! Product handlers

use std::future::Future;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::catalog::CatalogError;
use crate::domain::products::ProductId;

use super::error::ApiError;
use super::models::{ProductCreateRequest, ProductUpdateRequest};
use super::state::ApiState;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

pub async fn list_products(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let ctx = state.call_context();
    let listing = state.catalog.list_products(&ctx).await?;

    let cache_status = if listing.served_from_cache() {
        HeaderValue::from_static("HIT")
    } else {
        HeaderValue::from_static("MISS")
    };
    Ok(([(X_CACHE, cache_status)], Json(listing.products)).into_response())
}

pub async fn get_product(
    State(state): State<ApiState>,
    id: Result<Path<ProductId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let ctx = state.call_context();
    let product = state.catalog.get_product(&ctx, id).await?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<ApiState>,
    payload: Result<Json<ProductCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let ctx = state.call_context();
    let catalog = state.catalog.clone();
    let product =
        run_to_completion(async move { catalog.create_product(&ctx, payload.into()).await })
            .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<ApiState>,
    id: Result<Path<ProductId>, PathRejection>,
    payload: Result<Json<ProductUpdateRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let ctx = state.call_context();
    let catalog = state.catalog.clone();
    run_to_completion(async move { catalog.update_product(&ctx, id, payload.into()).await })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_product(
    State(state): State<ApiState>,
    id: Result<Path<ProductId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let ctx = state.call_context();
    let catalog = state.catalog.clone();
    run_to_completion(async move { catalog.delete_product(&ctx, id).await }).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Writes run on their own task so a client disconnect cannot cut a committed
/// mutation off from its cache reconciliation. The request deadline still applies.
async fn run_to_completion<T, F>(call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, CatalogError>> + Send + 'static,
{
    match tokio::spawn(call).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(join_err) => Err(ApiError::internal(format!(
            "catalog write task failed: {join_err}"
        ))),
    }
}
