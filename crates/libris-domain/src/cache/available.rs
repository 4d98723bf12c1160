//! Per-collection index of book ids believed available.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::backend::CacheBackend;
use super::entity::DEFAULT_ENTITY_TTL;
use crate::entity::ObjectId;

/// Reservation hint over the `available_books:<collection>` set keys.
///
/// The set is never a truth source: after [`reserve`](Self::reserve) the
/// caller must still perform the authoritative book write, and must
/// [`add`](Self::add) the id back on any later failure that did not consume
/// the reservation. Emptiness here never implies emptiness in the store.
///
/// On any backend error the whole set is dropped rather than left partially
/// inconsistent, and the operation degrades to a miss/no-op.
#[derive(Clone)]
pub struct AvailableBookIndex {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl AvailableBookIndex {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_ttl(backend, DEFAULT_ENTITY_TTL)
    }

    pub fn with_ttl(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    fn key(collection_id: &ObjectId) -> String {
        format!("available_books:{collection_id}")
    }

    /// Atomically removes and returns one id from the collection's set.
    ///
    /// `None` means the set is empty or missing; the caller must fall back
    /// to the authoritative store query.
    pub async fn reserve(&self, collection_id: &ObjectId) -> Option<ObjectId> {
        let key = Self::key(collection_id);
        match self.backend.set_pop(&key).await {
            Ok(Some(raw)) => match raw.parse::<ObjectId>() {
                Ok(id) => Some(id),
                Err(error) => {
                    warn!(%key, %error, "malformed id in available set, dropping set");
                    self.drop_set(&key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                warn!(%key, %error, "failed to pop from available set, dropping set");
                self.drop_set(&key).await;
                None
            }
        }
    }

    /// Adds an id to the collection's set.
    ///
    /// Used both to release a reservation after a failed workflow step and
    /// by write paths that make a book available again.
    pub async fn add(&self, collection_id: &ObjectId, book_id: &ObjectId) {
        let key = Self::key(collection_id);
        if let Err(error) = self
            .backend
            .set_add(&key, book_id.as_str(), self.ttl)
            .await
        {
            warn!(%key, %error, "failed to add to available set, dropping set");
            self.drop_set(&key).await;
        }
    }

    /// Removes an id from the collection's set. Idempotent.
    pub async fn remove(&self, collection_id: &ObjectId, book_id: &ObjectId) {
        let key = Self::key(collection_id);
        if let Err(error) = self.backend.set_remove(&key, book_id.as_str()).await {
            warn!(%key, %error, "failed to remove from available set, dropping set");
            self.drop_set(&key).await;
        }
    }

    /// Number of ids currently in the collection's set. 0 on error.
    pub async fn size(&self, collection_id: &ObjectId) -> u64 {
        let key = Self::key(collection_id);
        self.backend.set_size(&key).await.unwrap_or(0)
    }

    async fn drop_set(&self, key: &str) {
        if let Err(error) = self.backend.delete(key).await {
            warn!(%key, %error, "failed to drop available set");
        }
    }
}
