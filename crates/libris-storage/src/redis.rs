//! Redis-backed cache backend.
//!
//! Used when several processes share the hint cache. Connections come from
//! a deadpool pool built lazily from the configured address, so
//! construction never touches the network; errors surface per operation and
//! are absorbed by the cache layer's drop-the-key policy.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Connection, Pool, Runtime};

use libris_domain::cache::{CacheBackend, CacheError, CacheResult};

fn backend_err(error: impl std::fmt::Display) -> CacheError {
    CacheError::Backend(error.to_string())
}

/// [`CacheBackend`] over a shared Redis instance.
pub struct RedisCacheBackend {
    pool: Pool,
}

impl RedisCacheBackend {
    /// Builds a pool for `addr` (`host:port`), authenticating when a
    /// non-empty password is given.
    pub fn new(addr: &str, password: Option<&str>) -> CacheResult<Self> {
        let url = match password.filter(|p| !p.is_empty()) {
            Some(password) => format!("redis://:{password}@{addr}"),
            None => format!("redis://{addr}"),
        };
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(backend_err)?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> CacheResult<Connection> {
        self.pool.get().await.map_err(backend_err)
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await.map_err(backend_err)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.del(key).await.map_err(backend_err)?;
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.sadd(key, member).await.map_err(backend_err)?;
        // Refresh the set's lifetime on every add; a set only lives as long
        // as its most recent write.
        let _: i64 = conn
            .expire(key, ttl.as_secs().max(1) as i64)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.srem(key, member).await.map_err(backend_err)?;
        Ok(())
    }

    async fn set_pop(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await?;
        let member: Option<String> = conn.spop(key).await.map_err(backend_err)?;
        Ok(member)
    }

    async fn set_size(&self, key: &str) -> CacheResult<u64> {
        let mut conn = self.conn().await?;
        let size: u64 = conn.scard(key).await.map_err(backend_err)?;
        Ok(size)
    }
}
