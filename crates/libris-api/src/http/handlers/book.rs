//! Book endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use libris_domain::BookPatch;
use libris_server::rpc::BookDraft;

use super::parse_id;
use crate::http::envelope::{ApiFailure, HttpResponse};
use crate::http::params::parse_list_query;
use crate::state::AppState;

type Reply = Result<Json<HttpResponse>, ApiFailure>;

/// GET /api/v1/books — batched.
pub async fn list(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Reply {
    let query = parse_list_query(&pairs);
    let reply = state.book_batcher.get(query).await?;
    let data = reply.books.iter().map(|b| json!(b)).collect();
    Ok(Json(HttpResponse::ok(reply.message, data)))
}

/// GET /api/v1/books/:id
pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let book = state.books.find_by_id(&id).await?;
    Ok(Json(HttpResponse::ok("Book found", vec![json!(book)])))
}

/// Wire shape for book creation; accepts both naming conventions.
#[derive(Debug, Deserialize)]
pub struct CreateBookBody {
    #[serde(alias = "collectionId")]
    collection_id: String,
}

/// POST /api/v1/books
pub async fn create(State(state): State<AppState>, Json(body): Json<CreateBookBody>) -> Reply {
    let collection_id = parse_id(&body.collection_id)?;
    let book = state.books.add(BookDraft { collection_id }).await?;
    Ok(Json(HttpResponse::ok("Book added!", vec![json!(book)])))
}

/// PUT /api/v1/books/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BookPatch>,
) -> Reply {
    let id = parse_id(&id)?;
    let book = state.books.update(&id, patch).await?;
    Ok(Json(HttpResponse::ok("Book updated!", vec![json!(book)])))
}

/// DELETE /api/v1/books/:id
pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let book = state.books.delete(&id).await?;
    Ok(Json(HttpResponse::ok("Book deleted!", vec![json!(book)])))
}
