//! Collection service.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::{info, warn};

use libris_domain::cache::EntityCache;
use libris_domain::{Book, Collection, CollectionPatch, ObjectId};
use libris_storage::{CollectionStore, ListQuery};

use super::{BOOK_COUNT_KIND, COLLECTION_KIND};
use crate::retry::spawn_with_retries;
use crate::rpc::{BookApi, CollectionApi, CollectionDraft, CollectionReply, Status};

/// Owns collection rows and the cached collection entries.
///
/// Holds a late-bound book client: the collection and book services
/// reference each other, so the client is bound once after both exist
/// (see [`bind_books`](Self::bind_books)).
pub struct CollectionService {
    store: Arc<dyn CollectionStore>,
    cache: EntityCache,
    books: OnceLock<Arc<dyn BookApi>>,
}

impl CollectionService {
    pub fn new(store: Arc<dyn CollectionStore>, cache: EntityCache) -> Self {
        Self {
            store,
            cache,
            books: OnceLock::new(),
        }
    }

    /// Binds the book client. Later calls are ignored.
    pub fn bind_books(&self, books: Arc<dyn BookApi>) {
        let _ = self.books.set(books);
    }

    /// Seeds `total` available copies for a freshly created collection on a
    /// detached task with the standard bounded retry.
    fn spawn_seed_books(&self, collection: &Collection, total: i64) {
        let Some(books) = self.books.get().cloned() else {
            warn!(collection_id = %collection.id, "no book client bound, skipping book seeding");
            return;
        };
        let seeded: Vec<Book> = (0..total)
            .map(|_| Book::new(collection.id.clone()))
            .collect();
        let collection_id = collection.id.clone();

        spawn_with_retries("seed-collection-books", move |attempt| {
            let books = books.clone();
            let seeded = seeded.clone();
            let collection_id = collection_id.clone();
            async move {
                if attempt > 1 {
                    info!(%collection_id, attempt, "retrying book seeding");
                }
                books.bulk_insert(seeded).await
            }
        });
    }
}

#[async_trait]
impl CollectionApi for CollectionService {
    async fn get(&self, query: ListQuery) -> Result<CollectionReply, Status> {
        let collections = self.store.list(&query).await?;
        Ok(CollectionReply::new(
            "Collections retrieved successfully",
            collections,
        ))
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Collection, Status> {
        if let Some(cached) = self.cache.fetch(COLLECTION_KIND, id.as_str()).await {
            return Ok(cached);
        }

        let collection = self.store.find_by_id(id).await?;
        // Misses populate the cache; NotFound above is never cached.
        self.cache
            .store(COLLECTION_KIND, id.as_str(), &collection)
            .await;
        Ok(collection)
    }

    async fn add(&self, draft: CollectionDraft) -> Result<Collection, Status> {
        if self
            .store
            .exists_by_name_author(&draft.name, &draft.author, None)
            .await?
        {
            return Err(Status::already_exists("Collection already exists"));
        }

        let collection = Collection::new(
            draft.name,
            draft.author,
            draft.categories,
            draft.total_books.max(0),
        );
        self.store.insert(collection.clone()).await?;

        if collection.total_books > 0 {
            self.spawn_seed_books(&collection, collection.total_books);
        }

        Ok(collection)
    }

    async fn update(&self, id: &ObjectId, patch: CollectionPatch) -> Result<Collection, Status> {
        if patch.name.is_some() || patch.author.is_some() {
            let current = self.store.find_by_id(id).await?;
            let name = patch.name.as_deref().unwrap_or(&current.name);
            let author = patch.author.as_deref().unwrap_or(&current.author);
            if self
                .store
                .exists_by_name_author(name, author, Some(id))
                .await?
            {
                return Err(Status::already_exists("Collection already exists"));
            }
        }

        let updated = self.store.update(id, patch).await?;
        self.cache.invalidate(COLLECTION_KIND, id.as_str()).await;
        Ok(updated)
    }

    async fn delete(&self, id: &ObjectId) -> Result<Collection, Status> {
        let deleted = self.store.delete(id).await?;
        self.cache.invalidate(COLLECTION_KIND, id.as_str()).await;
        self.cache.invalidate(BOOK_COUNT_KIND, id.as_str()).await;
        Ok(deleted)
    }

    async fn adjust_stock(&self, id: &ObjectId, delta: i64) -> Result<(), Status> {
        // NotFound here means the row did not match; callers treat it as
        // failure.
        let updated = self.store.adjust_stock(id, delta).await?;

        // Fast path keeps the cached counter in lockstep instead of
        // invalidating; any cache trouble inside `store` falls back to
        // deleting the key.
        if self
            .cache
            .fetch::<Collection>(COLLECTION_KIND, id.as_str())
            .await
            .is_some()
        {
            self.cache
                .store(COLLECTION_KIND, id.as_str(), &updated)
                .await;
        }
        Ok(())
    }
}
