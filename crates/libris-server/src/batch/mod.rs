//! Gateway-side read batcher.
//!
//! Coalesces identical concurrent list reads into a single downstream call
//! within a short time window. Identity is the query fingerprint (filter,
//! sort, skip, limit); each fingerprint gets its own pending list and
//! one-shot timer, so divergent queries never steal each other's
//! parameters.

mod batcher;
mod targets;
mod types;

#[cfg(test)]
mod tests;

pub use batcher::ReadBatcher;
pub use targets::{BookListTarget, CollectionListTarget};
pub use types::{BatchTarget, DEFAULT_BATCH_WINDOW};
