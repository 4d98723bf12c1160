//! Book service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use libris_domain::cache::{AvailableBookIndex, EntityCache};
use libris_domain::{Book, BookPatch, ObjectId};
use libris_storage::{BookStore, ListQuery, StorageError};

use super::{BOOK_COUNT_KIND, BOOK_KIND};
use crate::retry::spawn_with_retries;
use crate::rpc::{BookApi, BookDraft, BookReply, CollectionApi, Status};

/// Owns book rows, the cached book entries and the available-book index.
pub struct BookService {
    store: Arc<dyn BookStore>,
    cache: EntityCache,
    index: AvailableBookIndex,
    collections: Arc<dyn CollectionApi>,
}

impl BookService {
    pub fn new(
        store: Arc<dyn BookStore>,
        cache: EntityCache,
        index: AvailableBookIndex,
        collections: Arc<dyn CollectionApi>,
    ) -> Self {
        Self {
            store,
            cache,
            index,
            collections,
        }
    }

    /// Adjusts the owning collection's stock counter on a detached task.
    /// Book writes are eventually consistent with `total_books`.
    fn spawn_stock_adjust(&self, collection_id: &ObjectId, delta: i64) {
        let collections = self.collections.clone();
        let collection_id = collection_id.clone();
        let task = if delta > 0 { "stock-increment" } else { "stock-decrement" };

        spawn_with_retries(task, move |_| {
            let collections = collections.clone();
            let collection_id = collection_id.clone();
            async move { collections.adjust_stock(&collection_id, delta).await }
        });
    }
}

#[async_trait]
impl BookApi for BookService {
    async fn get(&self, query: ListQuery) -> Result<BookReply, Status> {
        let books = self.store.list(&query).await?;
        Ok(BookReply::new("Books retrieved successfully", books))
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Book, Status> {
        if let Some(cached) = self.cache.fetch(BOOK_KIND, id.as_str()).await {
            return Ok(cached);
        }

        let book = self.store.find_by_id(id).await?;
        self.cache.store(BOOK_KIND, id.as_str(), &book).await;
        Ok(book)
    }

    async fn add(&self, draft: BookDraft) -> Result<Book, Status> {
        let book = Book::new(draft.collection_id);
        self.store.insert(book.clone()).await?;

        self.cache
            .invalidate(BOOK_COUNT_KIND, book.collection_id.as_str())
            .await;
        self.spawn_stock_adjust(&book.collection_id, 1);
        Ok(book)
    }

    async fn update(&self, id: &ObjectId, patch: BookPatch) -> Result<Book, Status> {
        let borrowed = patch.is_borrowed;
        let rest = BookPatch {
            is_borrowed: None,
            ..patch
        };

        let book = if rest.collection_id.is_some() || borrowed.is_none() {
            Some(self.store.update(id, rest).await?)
        } else {
            None
        };

        // The borrowed flag is a conditional write: claiming an already
        // borrowed copy fails, releasing is unconditional. The cache entry
        // is dropped even when the claim loses, because the field update
        // above may already have written.
        let flag_result = match borrowed {
            Some(true) => Some(self.store.claim(id).await),
            Some(false) => Some(self.store.release(id).await),
            None => None,
        };
        self.cache.invalidate(BOOK_KIND, id.as_str()).await;

        match flag_result {
            Some(result) => Ok(result?),
            // `book` is always Some here: the field-update branch ran.
            None => book.ok_or_else(|| Status::internal("book update produced no row")),
        }
    }

    async fn delete(&self, id: &ObjectId) -> Result<Book, Status> {
        let book = self.store.delete(id).await?;

        self.cache.invalidate(BOOK_KIND, id.as_str()).await;
        self.cache
            .invalidate(BOOK_COUNT_KIND, book.collection_id.as_str())
            .await;
        // A deleted copy must not stay reservable.
        self.index.remove(&book.collection_id, &book.id).await;
        self.spawn_stock_adjust(&book.collection_id, -1);
        Ok(book)
    }

    async fn get_available(&self, collection_id: &ObjectId) -> Result<Book, Status> {
        if let Some(book_id) = self.index.reserve(collection_id).await {
            debug!(%collection_id, %book_id, "reserved book from available index");
            // Only id, collection and the availability flag travel onward;
            // the authoritative row is not read on this path.
            let now = Utc::now();
            return Ok(Book {
                id: book_id,
                collection_id: collection_id.clone(),
                is_borrowed: false,
                created_at: now,
                updated_at: now,
            });
        }

        // Index empty or missing: the store is authoritative. The set is
        // deliberately not repopulated here; the borrow path would remove
        // the id again immediately.
        match self.store.find_available(collection_id).await {
            Ok(book) => Ok(book),
            Err(StorageError::NotFound { .. }) => Err(Status::not_found(format!(
                "no available book in collection {collection_id}"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn count(&self, collection_id: &ObjectId) -> Result<u64, Status> {
        if let Some(count) = self
            .cache
            .fetch::<u64>(BOOK_COUNT_KIND, collection_id.as_str())
            .await
        {
            return Ok(count);
        }

        let count = self.store.count(collection_id).await?;
        self.cache
            .store(BOOK_COUNT_KIND, collection_id.as_str(), &count)
            .await;
        Ok(count)
    }

    async fn bulk_insert(&self, books: Vec<Book>) -> Result<(), Status> {
        let mut collections: Vec<ObjectId> = books.iter().map(|b| b.collection_id.clone()).collect();
        collections.sort();
        collections.dedup();

        self.store.bulk_insert(books).await?;

        for collection_id in collections {
            self.cache
                .invalidate(BOOK_COUNT_KIND, collection_id.as_str())
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{Code, CollectionDraft, CollectionReply};
    use libris_domain::cache::MemoryCacheBackend;
    use libris_domain::{Collection, CollectionPatch};
    use libris_storage::MemoryBookStore;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    /// Collection client that only records stock adjustments.
    #[derive(Default)]
    struct RecordingCollections {
        adjustments: AtomicI64,
    }

    #[async_trait]
    impl CollectionApi for RecordingCollections {
        async fn get(&self, _query: ListQuery) -> Result<CollectionReply, Status> {
            Ok(CollectionReply::new("", vec![]))
        }

        async fn find_by_id(&self, id: &ObjectId) -> Result<Collection, Status> {
            Err(Status::not_found(format!("collection not found: {id}")))
        }

        async fn add(&self, _draft: CollectionDraft) -> Result<Collection, Status> {
            Err(Status::internal("unused"))
        }

        async fn update(
            &self,
            _id: &ObjectId,
            _patch: CollectionPatch,
        ) -> Result<Collection, Status> {
            Err(Status::internal("unused"))
        }

        async fn delete(&self, _id: &ObjectId) -> Result<Collection, Status> {
            Err(Status::internal("unused"))
        }

        async fn adjust_stock(&self, _id: &ObjectId, delta: i64) -> Result<(), Status> {
            self.adjustments.fetch_add(delta, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        service: BookService,
        store: Arc<MemoryBookStore>,
        index: AvailableBookIndex,
        collections: Arc<RecordingCollections>,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(MemoryCacheBackend::new());
        let store = Arc::new(MemoryBookStore::new());
        let index = AvailableBookIndex::new(backend.clone());
        let collections = Arc::new(RecordingCollections::default());
        let service = BookService::new(
            store.clone(),
            EntityCache::new(backend),
            index.clone(),
            collections.clone(),
        );
        Fixture {
            service,
            store,
            index,
            collections,
        }
    }

    async fn wait_for_adjustment(collections: &RecordingCollections, expected: i64) {
        for _ in 0..50 {
            if collections.adjustments.load(Ordering::SeqCst) == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "stock adjustment never reached {expected}, got {}",
            collections.adjustments.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_add_triggers_stock_increment_cascade() {
        let f = fixture();
        f.service
            .add(BookDraft {
                collection_id: ObjectId::new(),
            })
            .await
            .unwrap();

        wait_for_adjustment(&f.collections, 1).await;
    }

    #[tokio::test]
    async fn test_delete_triggers_stock_decrement_cascade() {
        let f = fixture();
        let book = f
            .service
            .add(BookDraft {
                collection_id: ObjectId::new(),
            })
            .await
            .unwrap();
        wait_for_adjustment(&f.collections, 1).await;

        f.service.delete(&book.id).await.unwrap();
        wait_for_adjustment(&f.collections, 0).await;
    }

    #[tokio::test]
    async fn test_find_book_by_id_cache_miss_then_set() {
        let f = fixture();
        let collection_id = ObjectId::new();
        // Scenario: a store row exists and nothing is cached yet.
        let mut book = Book::new(collection_id);
        book.id = "aaaaaaaaaaaaaaaaaaaaaaaa".parse().unwrap();
        f.store.insert(book.clone()).await.unwrap();

        let found = f.service.find_by_id(&book.id).await.unwrap();
        assert_eq!(found.id, book.id);

        // After the call the cache holds the row's JSON.
        let cached: Book = f
            .service
            .cache
            .fetch(BOOK_KIND, book.id.as_str())
            .await
            .unwrap();
        assert_eq!(cached, book);
    }

    #[tokio::test]
    async fn test_get_available_prefers_index_reservation() {
        let f = fixture();
        let collection_id = ObjectId::new();
        let book = Book::new(collection_id.clone());
        f.store.insert(book.clone()).await.unwrap();
        f.index.add(&collection_id, &book.id).await;

        let reserved = f.service.get_available(&collection_id).await.unwrap();
        assert_eq!(reserved.id, book.id);
        assert!(!reserved.is_borrowed);
        // The reservation consumed the set member.
        assert_eq!(f.index.size(&collection_id).await, 0);
    }

    #[tokio::test]
    async fn test_get_available_falls_back_to_store_without_repopulating() {
        let f = fixture();
        let collection_id = ObjectId::new();
        let book = Book::new(collection_id.clone());
        f.store.insert(book.clone()).await.unwrap();

        let found = f.service.get_available(&collection_id).await.unwrap();
        assert_eq!(found.id, book.id);
        assert_eq!(f.index.size(&collection_id).await, 0);
    }

    #[tokio::test]
    async fn test_get_available_nothing_left_is_not_found() {
        let f = fixture();
        let err = f.service.get_available(&ObjectId::new()).await.unwrap_err();
        assert_eq!(err.code, Code::NotFound);
    }

    #[tokio::test]
    async fn test_update_claim_conflict_is_aborted() {
        let f = fixture();
        let book = Book::new(ObjectId::new());
        f.store.insert(book.clone()).await.unwrap();

        f.service
            .update(&book.id, BookPatch::borrowed(true))
            .await
            .unwrap();

        let err = f
            .service
            .update(&book.id, BookPatch::borrowed(true))
            .await
            .unwrap_err();
        assert_eq!(err.code, Code::Aborted);
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_entry() {
        let f = fixture();
        let book = Book::new(ObjectId::new());
        f.store.insert(book.clone()).await.unwrap();
        f.service.find_by_id(&book.id).await.unwrap();

        f.service
            .update(&book.id, BookPatch::borrowed(true))
            .await
            .unwrap();

        assert!(f
            .service
            .cache
            .fetch::<Book>(BOOK_KIND, book.id.as_str())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_count_is_cached_until_invalidated_by_writes() {
        let f = fixture();
        let collection_id = ObjectId::new();
        f.store
            .insert(Book::new(collection_id.clone()))
            .await
            .unwrap();

        assert_eq!(f.service.count(&collection_id).await.unwrap(), 1);

        // A bulk insert invalidates the cached count.
        f.service
            .bulk_insert(vec![Book::new(collection_id.clone())])
            .await
            .unwrap();
        assert_eq!(f.service.count(&collection_id).await.unwrap(), 2);
    }
}
