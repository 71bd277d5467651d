pub mod api;
mod middleware;

pub use api::{ApiState, StoreHealth};
pub use middleware::RequestContext;

use axum::extract::State;
use axum::http::{Method, StatusCode, header};
use axum::middleware as axum_middleware;
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use sqlx::Error as SqlxError;
use tower_http::cors::{Any, CorsLayer};

use crate::application::error::ErrorReport;

use self::middleware::{log_responses, set_request_context};

/// Full HTTP surface: the product API plus the health check.
pub fn build_router(state: ApiState) -> Router {
    api::build_api_router()
        .route("/health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
        .layer(cors_layer())
}

/// Browser clients may call the API from any origin; preflights are answered here.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([api::products::X_CACHE])
}

async fn health(State(state): State<ApiState>) -> Response {
    db_health_response(state.store_health.check().await)
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
