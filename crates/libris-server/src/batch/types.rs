//! Batch target abstraction.

use std::time::Duration;

use async_trait::async_trait;

use libris_storage::ListQuery;

use crate::rpc::Status;

/// How long a batch collects waiters before its single downstream call.
pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(20);

/// The downstream call a [`ReadBatcher`](super::ReadBatcher) is
/// parameterized by.
///
/// The reply is cloned once per waiter, so targets return cheaply clonable
/// envelopes.
#[async_trait]
pub trait BatchTarget: Send + Sync + 'static {
    type Reply: Clone + Send + 'static;

    async fn fetch(&self, query: &ListQuery) -> Result<Self::Reply, Status>;
}
