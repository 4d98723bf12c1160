//! HTTP gateway tests over a fully wired in-memory stack.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot

use libris_api::middleware::RateLimiter;
use libris_api::{http::create_router, AppState};
use libris_domain::cache::{AvailableBookIndex, EntityCache, MemoryCacheBackend};
use libris_domain::{Book, Collection, CollectionPatch, ObjectId};
use libris_server::rpc::{CollectionApi, CollectionDraft, CollectionReply, Status};
use libris_server::service::{BookService, BorrowService, CollectionService};
use libris_storage::{
    BookStore, CollectionStore, ListQuery, MemoryBookStore, MemoryBorrowStore,
    MemoryCollectionStore,
};

/// Collection client wrapper that counts downstream list calls, so tests
/// can observe batcher coalescing through the HTTP surface.
struct CountingCollections {
    inner: Arc<dyn CollectionApi>,
    list_calls: AtomicUsize,
}

impl CountingCollections {
    fn new(inner: Arc<dyn CollectionApi>) -> Self {
        Self {
            inner,
            list_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CollectionApi for CountingCollections {
    async fn get(&self, query: ListQuery) -> Result<CollectionReply, Status> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(query).await
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Collection, Status> {
        self.inner.find_by_id(id).await
    }

    async fn add(&self, draft: CollectionDraft) -> Result<Collection, Status> {
        self.inner.add(draft).await
    }

    async fn update(&self, id: &ObjectId, patch: CollectionPatch) -> Result<Collection, Status> {
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &ObjectId) -> Result<Collection, Status> {
        self.inner.delete(id).await
    }

    async fn adjust_stock(&self, id: &ObjectId, delta: i64) -> Result<(), Status> {
        self.inner.adjust_stock(id, delta).await
    }
}

struct Stack {
    router: Router,
    collection_store: Arc<MemoryCollectionStore>,
    book_store: Arc<MemoryBookStore>,
    counting: Arc<CountingCollections>,
}

fn stack_with_rate_limit(rate_limit: u32) -> Stack {
    let backend = Arc::new(MemoryCacheBackend::new());
    let cache = EntityCache::new(backend.clone());
    let index = AvailableBookIndex::new(backend);

    let collection_store = Arc::new(MemoryCollectionStore::new());
    let book_store = Arc::new(MemoryBookStore::new());
    let borrow_store = Arc::new(MemoryBorrowStore::new());

    let collections = Arc::new(CollectionService::new(collection_store.clone(), cache.clone()));
    let books = Arc::new(BookService::new(
        book_store.clone(),
        cache,
        index.clone(),
        collections.clone(),
    ));
    collections.bind_books(books.clone());
    let borrows = Arc::new(BorrowService::new(
        borrow_store,
        collections.clone(),
        books.clone(),
        index,
    ));

    let counting = Arc::new(CountingCollections::new(collections));
    let state = AppState::new(
        counting.clone(),
        books,
        borrows,
        Duration::from_millis(20),
    );
    let limiter = Arc::new(RateLimiter::new(rate_limit, Duration::from_secs(60)));

    Stack {
        router: create_router(state, limiter),
        collection_store,
        book_store,
        counting,
    }
}

fn stack() -> Stack {
    stack_with_rate_limit(10_000)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let s = stack();
    let (status, body) = send(&s.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_collection_crud_round_trip() {
    let s = stack();

    let (status, body) = send(
        &s.router,
        post(
            "/api/v1/collections",
            json!({"name": "Dune", "author": "Frank Herbert", "categories": ["sci-fi"], "total_books": 0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let id = body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&s.router, get(&format!("/api/v1/collections/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Dune");

    let update = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/v1/collections/{id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"name": "Dune Messiah"}).to_string()))
        .unwrap();
    let (status, body) = send(&s.router, update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Dune Messiah");

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/v1/collections/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&s.router, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&s.router, get(&format!("/api/v1/collections/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_duplicate_collection_conflicts() {
    let s = stack();
    let body = json!({"name": "Dune", "author": "Frank Herbert", "total_books": 0});

    let (status, _) = send(&s.router, post("/api/v1/collections", body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, reply) = send(&s.router, post("/api/v1/collections", body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(reply["success"], false);
}

#[tokio::test]
async fn test_malformed_path_id_is_bad_request() {
    let s = stack();
    let (status, body) = send(&s.router, get("/api/v1/collections/not-an-id")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_borrow_and_return_through_gateway() {
    let s = stack();
    // Seed directly so the background seeding task is not in play.
    let collection = Collection::new("Dune", "Frank Herbert", vec![], 1);
    s.collection_store.insert(collection.clone()).await.unwrap();
    let book = Book::new(collection.id.clone());
    s.book_store.insert(book.clone()).await.unwrap();

    let (status, body) = send(
        &s.router,
        post(
            "/api/v1/borrow",
            json!({"collectionId": collection.id, "userId": ObjectId::new()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let borrow_id = body["data"][0]["borrow_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"][0]["book_id"], json!(book.id));
    assert!(s.book_store.find_by_id(&book.id).await.unwrap().is_borrowed);

    // Nothing left to borrow.
    let (status, _) = send(
        &s.router,
        post(
            "/api/v1/borrow",
            json!({"collectionId": collection.id, "userId": ObjectId::new()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &s.router,
        post("/api/v1/borrow/return", json!({"borrowId": borrow_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!s.book_store.find_by_id(&book.id).await.unwrap().is_borrowed);

    // Returning again is a precondition failure.
    let (status, body) = send(
        &s.router,
        post("/api/v1/borrow/return", json!({"borrowId": borrow_id})),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_fifty_concurrent_list_reads_coalesce_downstream() {
    let s = stack();
    s.collection_store
        .insert(Collection::new("Dune", "Frank Herbert", vec![], 1))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let router = s.router.clone();
        handles.push(tokio::spawn(async move {
            let response = router
                .oneshot(get("/api/v1/collections"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap()
        }));
    }

    let bodies: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    // Exactly one downstream Collection.get, identical payloads fanned out.
    assert_eq!(s.counting.list_calls.load(Ordering::SeqCst), 1);
    assert!(bodies.iter().all(|b| b == &bodies[0]));
}

#[tokio::test]
async fn test_divergent_list_queries_are_not_merged() {
    let s = stack();

    let (a, b) = tokio::join!(
        send(&s.router, get("/api/v1/collections?limit=5")),
        send(&s.router, get("/api/v1/collections?limit=50")),
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);
    assert_eq!(s.counting.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_limiter_returns_429_with_retry_after() {
    let s = stack_with_rate_limit(2);

    let (status, _) = send(&s.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&s.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&s.router, get("/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["retry_after"], 60.0);
}

#[tokio::test]
async fn test_rate_limiter_distinguishes_forwarded_clients() {
    let s = stack_with_rate_limit(1);

    let from = |ip: &str| {
        Request::builder()
            .uri("/health")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&s.router, from("1.1.1.1")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&s.router, from("2.2.2.2")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&s.router, from("1.1.1.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let s = stack();
    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/collections")
        .header(header::ORIGIN, "http://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = s.router.clone().oneshot(preflight).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
