//! Client traits for the three services.
//!
//! Construction order breaks the book/collection cycle: the collection
//! service is built first and its book client bound afterwards, so each
//! service only ever sees a ready client.

use async_trait::async_trait;

use libris_domain::{Book, BookPatch, Collection, CollectionPatch, ObjectId};
use libris_storage::ListQuery;

use super::status::Status;
use super::types::{BookDraft, BookReply, BorrowReply, CollectionDraft, CollectionReply};

/// Collection service operations.
#[async_trait]
pub trait CollectionApi: Send + Sync + 'static {
    async fn get(&self, query: ListQuery) -> Result<CollectionReply, Status>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Collection, Status>;

    async fn add(&self, draft: CollectionDraft) -> Result<Collection, Status>;

    async fn update(&self, id: &ObjectId, patch: CollectionPatch) -> Result<Collection, Status>;

    async fn delete(&self, id: &ObjectId) -> Result<Collection, Status>;

    /// Atomically adjusts the collection's `total_books` by `delta`.
    async fn adjust_stock(&self, id: &ObjectId, delta: i64) -> Result<(), Status>;
}

/// Book service operations.
#[async_trait]
pub trait BookApi: Send + Sync + 'static {
    async fn get(&self, query: ListQuery) -> Result<BookReply, Status>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Book, Status>;

    async fn add(&self, draft: BookDraft) -> Result<Book, Status>;

    /// Applies the patch. A patch setting `is_borrowed = true` is a
    /// conditional write: it fails with `Aborted` when the copy is already
    /// borrowed.
    async fn update(&self, id: &ObjectId, patch: BookPatch) -> Result<Book, Status>;

    async fn delete(&self, id: &ObjectId) -> Result<Book, Status>;

    /// Returns an available copy of the collection, trying the
    /// available-book index before the store. `NotFound` when the
    /// collection has no available copy.
    async fn get_available(&self, collection_id: &ObjectId) -> Result<Book, Status>;

    async fn count(&self, collection_id: &ObjectId) -> Result<u64, Status>;

    async fn bulk_insert(&self, books: Vec<Book>) -> Result<(), Status>;
}

/// Borrow coordinator operations.
#[async_trait]
pub trait BorrowApi: Send + Sync + 'static {
    async fn borrow(&self, collection_id: &ObjectId, user_id: &ObjectId)
        -> Result<BorrowReply, Status>;

    async fn return_book(&self, borrow_id: &ObjectId) -> Result<BorrowReply, Status>;
}
