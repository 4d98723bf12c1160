//! Router assembly and global middleware.

use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::middleware::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

use super::handlers::{book, borrow, collection};

/// GET /health — liveness only, no dependency checks.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

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
        .allow_headers(Any)
}

/// Builds the gateway router with CORS and rate limiting applied globally.
pub fn create_router(state: AppState, limiter: Arc<RateLimiter>) -> Router {
    let api = Router::new()
        .route("/collections", get(collection::list).post(collection::create))
        .route(
            "/collections/:id",
            get(collection::get_by_id)
                .put(collection::update)
                .delete(collection::remove),
        )
        .route("/books", get(book::list).post(book::create))
        .route(
            "/books/:id",
            get(book::get_by_id).put(book::update).delete(book::remove),
        )
        .route("/borrow", post(borrow::borrow))
        .route("/borrow/return", post(borrow::return_book));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(cors_layer())
}
