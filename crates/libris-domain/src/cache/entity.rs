//! Read-through, write-invalidate entity cache.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::backend::CacheBackend;

/// Lifetime of a cached entity entry.
pub const DEFAULT_ENTITY_TTL: Duration = Duration::from_secs(60 * 60);

/// JSON entity cache keyed by `kind:id`.
///
/// Read paths call [`fetch`](Self::fetch) and fall through to the
/// authoritative store on `None`; after a successful store read they call
/// [`store`](Self::store). Write paths call
/// [`invalidate`](Self::invalidate) instead of updating in place, so
/// concurrent readers see at worst a briefly stale entry and never a
/// write-write cache race. Store misses are never cached.
#[derive(Clone)]
pub struct EntityCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl EntityCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_ttl(backend, DEFAULT_ENTITY_TTL)
    }

    pub fn with_ttl(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    fn key(kind: &str, id: &str) -> String {
        format!("{kind}:{id}")
    }

    /// Returns the cached entity, or `None` on miss.
    ///
    /// Backend errors are swallowed as misses. A payload that fails to
    /// decode is deleted and reported as a miss so the next read repopulates
    /// it from the store.
    pub async fn fetch<T: DeserializeOwned>(&self, kind: &str, id: &str) -> Option<T> {
        let key = Self::key(kind, id);
        let payload = match self.backend.get(&key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                metrics::counter!("libris_entity_cache_misses_total").increment(1);
                return None;
            }
            Err(error) => {
                debug!(%key, %error, "cache read failed, treating as miss");
                metrics::counter!("libris_entity_cache_misses_total").increment(1);
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                metrics::counter!("libris_entity_cache_hits_total").increment(1);
                Some(value)
            }
            Err(error) => {
                warn!(%key, %error, "cached payload failed to decode, evicting");
                if let Err(error) = self.backend.delete(&key).await {
                    warn!(%key, %error, "failed to evict undecodable cache entry");
                }
                metrics::counter!("libris_entity_cache_misses_total").increment(1);
                None
            }
        }
    }

    /// Caches the entity under `kind:id` with the configured TTL.
    ///
    /// Any failure, serialization included, deletes the key instead of
    /// leaving a possibly stale entry behind.
    pub async fn store<T: Serialize>(&self, kind: &str, id: &str, value: &T) {
        let key = Self::key(kind, id);
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%key, %error, "failed to encode entity for cache");
                self.invalidate(kind, id).await;
                return;
            }
        };
        if let Err(error) = self.backend.set(&key, payload, self.ttl).await {
            warn!(%key, %error, "failed to write cache entry");
            self.invalidate(kind, id).await;
        }
    }

    /// Deletes the `kind:id` entry. Never fails observably; invalidating an
    /// absent key is a no-op.
    pub async fn invalidate(&self, kind: &str, id: &str) {
        let key = Self::key(kind, id);
        if let Err(error) = self.backend.delete(&key).await {
            warn!(%key, %error, "failed to invalidate cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::backend::MemoryCacheBackend;
    use super::*;
    use crate::entity::{Book, ObjectId};

    fn cache() -> (EntityCache, Arc<MemoryCacheBackend>) {
        let backend = Arc::new(MemoryCacheBackend::new());
        (EntityCache::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_fetch_miss_then_store_then_hit() {
        let (cache, _) = cache();
        let book = Book::new(ObjectId::new());
        let id = book.id.to_string();

        assert!(cache.fetch::<Book>("book", &id).await.is_none());

        cache.store("book", &id, &book).await;
        let cached: Book = cache.fetch("book", &id).await.unwrap();
        assert_eq!(cached, book);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_evicted() {
        let (cache, backend) = cache();
        backend
            .set("book:bad", "not json".into(), DEFAULT_ENTITY_TTL)
            .await
            .unwrap();

        assert!(cache.fetch::<Book>("book", "bad").await.is_none());
        // The broken entry is gone, not just skipped.
        assert_eq!(backend.get("book:bad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_absent_key_is_noop() {
        let (cache, _) = cache();
        cache.invalidate("book", "missing").await;
        cache.invalidate("book", "missing").await;
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let (cache, _) = cache();
        let book = Book::new(ObjectId::new());
        let id = book.id.to_string();
        cache.store("book", &id, &book).await;

        cache.invalidate("book", &id).await;
        assert!(cache.fetch::<Book>("book", &id).await.is_none());
    }
}
