//! Batch targets bridging the batcher to the service clients.

use std::sync::Arc;

use async_trait::async_trait;

use libris_storage::ListQuery;

use super::types::BatchTarget;
use crate::rpc::{BookApi, BookReply, CollectionApi, CollectionReply, Status};

/// Batched collection list reads.
pub struct CollectionListTarget {
    client: Arc<dyn CollectionApi>,
}

impl CollectionListTarget {
    pub fn new(client: Arc<dyn CollectionApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BatchTarget for CollectionListTarget {
    type Reply = CollectionReply;

    async fn fetch(&self, query: &ListQuery) -> Result<CollectionReply, Status> {
        self.client.get(query.clone()).await
    }
}

/// Batched book list reads.
pub struct BookListTarget {
    client: Arc<dyn BookApi>,
}

impl BookListTarget {
    pub fn new(client: Arc<dyn BookApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BatchTarget for BookListTarget {
    type Reply = BookReply;

    async fn fetch(&self, query: &ListQuery) -> Result<BookReply, Status> {
        self.client.get(query.clone()).await
    }
}
