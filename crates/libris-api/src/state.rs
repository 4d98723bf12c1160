//! Application state for the gateway handlers.

use std::sync::Arc;
use std::time::Duration;

use libris_server::batch::{BookListTarget, CollectionListTarget, ReadBatcher};
use libris_server::rpc::{BookApi, BorrowApi, CollectionApi};

/// Service clients plus the per-resource read batchers, shared across all
/// gateway handlers.
#[derive(Clone)]
pub struct AppState {
    pub collections: Arc<dyn CollectionApi>,
    pub books: Arc<dyn BookApi>,
    pub borrows: Arc<dyn BorrowApi>,
    pub collection_batcher: Arc<ReadBatcher<CollectionListTarget>>,
    pub book_batcher: Arc<ReadBatcher<BookListTarget>>,
}

impl AppState {
    /// Builds the state from pre-wired clients, creating one batcher per
    /// listable resource with the given window.
    pub fn new(
        collections: Arc<dyn CollectionApi>,
        books: Arc<dyn BookApi>,
        borrows: Arc<dyn BorrowApi>,
        batch_window: Duration,
    ) -> Self {
        let collection_batcher = Arc::new(ReadBatcher::with_window(
            Arc::new(CollectionListTarget::new(collections.clone())),
            batch_window,
        ));
        let book_batcher = Arc::new(ReadBatcher::with_window(
            Arc::new(BookListTarget::new(books.clone())),
            batch_window,
        ));
        Self {
            collections,
            books,
            borrows,
            collection_batcher,
            book_batcher,
        }
    }
}
