//! Collection endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::json;

use libris_domain::CollectionPatch;
use libris_server::rpc::CollectionDraft;

use super::parse_id;
use crate::http::envelope::{ApiFailure, HttpResponse};
use crate::http::params::parse_list_query;
use crate::state::AppState;

type Reply = Result<Json<HttpResponse>, ApiFailure>;

/// GET /api/v1/collections — batched.
pub async fn list(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Reply {
    let query = parse_list_query(&pairs);
    let reply = state.collection_batcher.get(query).await?;
    let data = reply.collections.iter().map(|c| json!(c)).collect();
    Ok(Json(HttpResponse::ok(reply.message, data)))
}

/// GET /api/v1/collections/:id
pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let collection = state.collections.find_by_id(&id).await?;
    Ok(Json(HttpResponse::ok(
        "Collection found",
        vec![json!(collection)],
    )))
}

/// POST /api/v1/collections
pub async fn create(State(state): State<AppState>, Json(draft): Json<CollectionDraft>) -> Reply {
    let collection = state.collections.add(draft).await?;
    Ok(Json(HttpResponse::ok(
        "Collection added!",
        vec![json!(collection)],
    )))
}

/// PUT /api/v1/collections/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CollectionPatch>,
) -> Reply {
    let id = parse_id(&id)?;
    let collection = state.collections.update(&id, patch).await?;
    Ok(Json(HttpResponse::ok(
        "Collection updated!",
        vec![json!(collection)],
    )))
}

/// DELETE /api/v1/collections/:id
pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let collection = state.collections.delete(&id).await?;
    Ok(Json(HttpResponse::ok(
        "Collection deleted!",
        vec![json!(collection)],
    )))
}
