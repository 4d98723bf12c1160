//! Domain layer for the libris library backend.
//!
//! Holds the entity model (collections, books, borrow records) and the cache
//! coordination layer: the backend abstraction, the read-through entity
//! cache and the available-book index. Authoritative truth always lives in
//! the stores; everything cached here is a hint that callers must be able to
//! lose at any time.

pub mod cache;
pub mod entity;

pub use entity::{
    Book, BookPatch, Borrow, Collection, CollectionPatch, ObjectId, ParseIdError,
};
