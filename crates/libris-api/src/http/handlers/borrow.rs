//! Borrow endpoints.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::parse_id;
use crate::http::envelope::{ApiFailure, HttpResponse};
use crate::state::AppState;

type Reply = Result<Json<HttpResponse>, ApiFailure>;

/// Body for POST /api/v1/borrow; accepts both naming conventions.
#[derive(Debug, Deserialize)]
pub struct BorrowBody {
    #[serde(alias = "collectionId")]
    collection_id: String,
    #[serde(alias = "userId")]
    user_id: String,
}

/// Body for POST /api/v1/borrow/return.
#[derive(Debug, Deserialize)]
pub struct ReturnBody {
    #[serde(alias = "borrowId")]
    borrow_id: String,
}

/// POST /api/v1/borrow
pub async fn borrow(State(state): State<AppState>, Json(body): Json<BorrowBody>) -> Reply {
    let collection_id = parse_id(&body.collection_id)?;
    let user_id = parse_id(&body.user_id)?;

    let reply = state.borrows.borrow(&collection_id, &user_id).await?;
    Ok(Json(HttpResponse::ok(
        reply.message.clone(),
        vec![json!({
            "borrow_id": reply.borrow_id,
            "book_id": reply.book_id,
        })],
    )))
}

/// POST /api/v1/borrow/return
pub async fn return_book(State(state): State<AppState>, Json(body): Json<ReturnBody>) -> Reply {
    let borrow_id = parse_id(&body.borrow_id)?;

    let reply = state.borrows.return_book(&borrow_id).await?;
    Ok(Json(HttpResponse::ok(
        reply.message.clone(),
        vec![json!({
            "borrow_id": reply.borrow_id,
            "book_id": reply.book_id,
        })],
    )))
}
