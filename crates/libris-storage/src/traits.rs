//! Store trait definitions.
//!
//! One trait per entity, covering exactly the operations the services
//! invoke. Implementations must be thread-safe; per-row mutation must be
//! atomic (the memory backends get this from their map's entry API, a
//! document store from per-document atomicity). Nothing is atomic across
//! rows or across stores; the borrow coordinator's compensation logic is
//! the only cross-store mechanism.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use libris_domain::{Book, BookPatch, Borrow, Collection, CollectionPatch, ObjectId};

use crate::error::StorageResult;
use crate::query::ListQuery;

/// Store of collection rows.
#[async_trait]
pub trait CollectionStore: Send + Sync + 'static {
    /// Lists collections matching the query's filter, sorted and paginated.
    async fn list(&self, query: &ListQuery) -> StorageResult<Vec<Collection>>;

    /// Returns the collection or `StorageError::NotFound`.
    async fn find_by_id(&self, id: &ObjectId) -> StorageResult<Collection>;

    /// Whether a collection with this `(name, author)` pair exists,
    /// optionally ignoring one id (used when updating a row in place).
    async fn exists_by_name_author(
        &self,
        name: &str,
        author: &str,
        exclude: Option<&ObjectId>,
    ) -> StorageResult<bool>;

    /// Inserts a new row. `StorageError::Duplicate` on id collision.
    async fn insert(&self, collection: Collection) -> StorageResult<()>;

    /// Applies the patch and returns the updated row.
    async fn update(&self, id: &ObjectId, patch: CollectionPatch) -> StorageResult<Collection>;

    /// Deletes and returns the row.
    async fn delete(&self, id: &ObjectId) -> StorageResult<Collection>;

    /// Atomically increments `total_books` by `delta` (may be negative) and
    /// returns the updated row. `StorageError::NotFound` when no row
    /// matched; callers treat that as failure.
    async fn adjust_stock(&self, id: &ObjectId, delta: i64) -> StorageResult<Collection>;
}

/// Store of book rows.
#[async_trait]
pub trait BookStore: Send + Sync + 'static {
    async fn list(&self, query: &ListQuery) -> StorageResult<Vec<Book>>;

    async fn find_by_id(&self, id: &ObjectId) -> StorageResult<Book>;

    /// Returns some book of the collection with `is_borrowed = false`, or
    /// `StorageError::NotFound` when none is available. This query is the
    /// authoritative fallback when the available-book index is empty.
    async fn find_available(&self, collection_id: &ObjectId) -> StorageResult<Book>;

    async fn insert(&self, book: Book) -> StorageResult<()>;

    /// Applies the patch (everything except the borrowed flag, which goes
    /// through [`claim`](Self::claim) / [`release`](Self::release)) and
    /// returns the updated row.
    async fn update(&self, id: &ObjectId, patch: BookPatch) -> StorageResult<Book>;

    async fn delete(&self, id: &ObjectId) -> StorageResult<Book>;

    /// Conditionally marks the book borrowed: succeeds only when
    /// `is_borrowed` is currently false, otherwise
    /// `StorageError::PreconditionFailed`. The loser of two racing borrows
    /// fails here instead of silently double-borrowing the copy.
    async fn claim(&self, id: &ObjectId) -> StorageResult<Book>;

    /// Unconditionally marks the book available again.
    async fn release(&self, id: &ObjectId) -> StorageResult<Book>;

    /// Number of book rows in the collection.
    async fn count(&self, collection_id: &ObjectId) -> StorageResult<u64>;

    /// Inserts many rows at once (collection seeding). Not atomic across
    /// rows; an id collision aborts the remainder.
    async fn bulk_insert(&self, books: Vec<Book>) -> StorageResult<()>;
}

/// Store of borrow records.
#[async_trait]
pub trait BorrowStore: Send + Sync + 'static {
    async fn find_by_id(&self, id: &ObjectId) -> StorageResult<Borrow>;

    async fn insert(&self, borrow: Borrow) -> StorageResult<()>;

    /// Sets `return_date` (and `updated_at`) to `returned_at` and returns
    /// the updated row. Last-writer-wins on the return date; the
    /// one-transition state machine is enforced by the coordinator's read
    /// of `return_date` before calling this.
    async fn close(&self, id: &ObjectId, returned_at: DateTime<Utc>) -> StorageResult<Borrow>;
}
