//! Storage layer for the libris library backend.
//!
//! The authoritative document store is reached through the per-entity store
//! traits in [`traits`]; the in-memory backends in [`memory`] implement them
//! for tests and single-process deployments. [`redis`] provides the shared
//! cache backend used when more than one process shares the hint cache.

pub mod error;
pub mod memory;
pub mod query;
pub mod redis;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryBookStore, MemoryBorrowStore, MemoryCollectionStore};
pub use query::{ListQuery, SortKey, DEFAULT_LIMIT, MAX_LIMIT};
pub use redis::RedisCacheBackend;
pub use traits::{BookStore, BorrowStore, CollectionStore};
