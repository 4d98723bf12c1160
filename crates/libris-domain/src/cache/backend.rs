//! Cache backend abstraction and the in-process implementation.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use thiserror::Error;

/// Cache-layer errors.
///
/// Callers never bubble these up to clients: read paths treat them as
/// misses, write paths respond by deleting the affected key.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The backend itself failed (connection, protocol, pool).
    #[error("cache backend error: {0}")]
    Backend(String),

    /// The key exists but holds a different value kind than the operation
    /// expects (string entry vs. id set).
    #[error("wrong value kind for cache key: {key}")]
    WrongKind { key: String },
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Per-key cache operations the coordination layer is built on.
///
/// Two value kinds exist: plain string entries (JSON-encoded entities) and
/// sets of string members (available book ids). Set mutation is atomic per
/// key; nothing is atomic across keys. Implementations must be thread-safe.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Reads a string entry. `Ok(None)` on miss or expiry.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Writes a string entry with the given lifetime.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Deletes a key of either kind. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Adds a member to the set at `key`, creating it with the given
    /// lifetime if absent.
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> CacheResult<()>;

    /// Removes a member from the set at `key`. Absent key or member is a
    /// no-op.
    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()>;

    /// Atomically removes and returns one uniformly chosen member, or
    /// `Ok(None)` when the set is absent or empty.
    async fn set_pop(&self, key: &str) -> CacheResult<Option<String>>;

    /// Number of members in the set at `key` (0 when absent).
    async fn set_size(&self, key: &str) -> CacheResult<u64>;
}

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

impl Entry {
    fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process [`CacheBackend`].
///
/// Entries carry an absolute expiry checked on access; expired entries are
/// dropped lazily by whichever operation touches them next. Set mutation
/// goes through the map's entry API so pop/add/remove are atomic per key.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: DashMap<String, Entry>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the entry if expired, returning whether it is still live.
    fn prune(&self, key: &str) -> bool {
        if let Some(entry) = self.entries.get(key) {
            if !entry.expired() {
                return true;
            }
        } else {
            return false;
        }
        self.entries.remove_if(key, |_, e| e.expired());
        self.entries.contains_key(key)
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if !self.prune(key) {
            return Ok(None);
        }
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Text(s) => Ok(Some(s.clone())),
                Value::Set(_) => Err(CacheError::WrongKind {
                    key: key.to_string(),
                }),
            },
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> CacheResult<()> {
        use dashmap::mapref::entry::Entry as MapEntry;

        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().expired() {
                    occupied.insert(Entry {
                        value: Value::Set(HashSet::from([member.to_string()])),
                        expires_at: Instant::now() + ttl,
                    });
                    return Ok(());
                }
                match &mut occupied.get_mut().value {
                    Value::Set(members) => {
                        members.insert(member.to_string());
                        Ok(())
                    }
                    Value::Text(_) => Err(CacheError::WrongKind {
                        key: key.to_string(),
                    }),
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::Set(HashSet::from([member.to_string()])),
                    expires_at: Instant::now() + ttl,
                });
                Ok(())
            }
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()> {
        if !self.prune(key) {
            return Ok(());
        }
        match self.entries.get_mut(key).as_deref_mut() {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => {
                members.remove(member);
                Ok(())
            }
            Some(_) => Err(CacheError::WrongKind {
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn set_pop(&self, key: &str) -> CacheResult<Option<String>> {
        if !self.prune(key) {
            return Ok(None);
        }
        match self.entries.get_mut(key).as_deref_mut() {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => {
                if members.is_empty() {
                    return Ok(None);
                }
                let idx = rand::thread_rng().gen_range(0..members.len());
                let picked = members
                    .iter()
                    .nth(idx)
                    .cloned()
                    .expect("index bounded by len");
                members.remove(&picked);
                Ok(Some(picked))
            }
            Some(_) => Err(CacheError::WrongKind {
                key: key.to_string(),
            }),
            None => Ok(None),
        }
    }

    async fn set_size(&self, key: &str) -> CacheResult<u64> {
        if !self.prune(key) {
            return Ok(0);
        }
        match self.entries.get(key).as_deref() {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(members.len() as u64),
            Some(_) => Err(CacheError::WrongKind {
                key: key.to_string(),
            }),
            None => Ok(0),
        }
    }
}
