//! Cache coordination layer.
//!
//! Everything in here is a performance aid, never a source of truth: every
//! caller must tolerate a miss by falling through to the authoritative
//! store, and every error on a write path degrades to deleting the affected
//! key rather than leaving a half-updated value behind.
//!
//! Three pieces:
//! - [`CacheBackend`]: the per-key operations the layer is built on, with an
//!   in-process implementation ([`MemoryCacheBackend`]) used by default and
//!   by tests. A Redis-backed implementation lives in the storage crate.
//! - [`EntityCache`]: read-through, write-invalidate storage of JSON-encoded
//!   entities under `kind:id` keys.
//! - [`AvailableBookIndex`]: a per-collection set of book ids believed
//!   available, used to reserve a candidate without a store query.

mod available;
mod backend;
mod entity;

pub use available::AvailableBookIndex;
pub use backend::{CacheBackend, CacheError, CacheResult, MemoryCacheBackend};
pub use entity::{EntityCache, DEFAULT_ENTITY_TTL};
