//! Tests for the read batcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use libris_storage::{ListQuery, SortKey};

use super::batcher::ReadBatcher;
use super::types::BatchTarget;
use crate::rpc::Status;

/// Target that records every downstream call it receives.
#[derive(Default)]
struct RecordingTarget {
    calls: AtomicUsize,
    queries: Mutex<Vec<ListQuery>>,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingTarget {
    fn new() -> Self {
        Self::default()
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchTarget for RecordingTarget {
    type Reply = String;

    async fn fetch(&self, query: &ListQuery) -> Result<String, Status> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            Err(Status::internal("downstream unavailable"))
        } else {
            Ok(format!("payload-{call}"))
        }
    }
}

fn batcher(target: Arc<RecordingTarget>) -> Arc<ReadBatcher<RecordingTarget>> {
    Arc::new(ReadBatcher::with_window(target, Duration::from_millis(20)))
}

#[tokio::test]
async fn test_fifty_identical_reads_issue_one_downstream_call() {
    let target = Arc::new(RecordingTarget::new());
    let batcher = batcher(target.clone());

    let mut handles = Vec::new();
    for _ in 0..50 {
        let batcher = batcher.clone();
        handles.push(tokio::spawn(async move {
            batcher.get(ListQuery::default()).await
        }));
    }

    let results: Vec<String> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(target.call_count(), 1);
    // Every waiter got the identical payload.
    assert!(results.iter().all(|r| r == &results[0]));
}

#[tokio::test]
async fn test_divergent_fingerprints_get_separate_batches() {
    let target = Arc::new(RecordingTarget::new());
    let batcher = batcher(target.clone());

    let sorted = ListQuery {
        sort: vec![SortKey::desc("name")],
        ..ListQuery::default()
    };

    let (a, b) = tokio::join!(
        batcher.get(ListQuery::default()),
        batcher.get(sorted.clone())
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(target.call_count(), 2);
    let queries = target.queries.lock().unwrap();
    assert!(queries.iter().any(|q| q.sort.is_empty()));
    assert!(queries.iter().any(|q| q.sort == sorted.sort));
}

#[tokio::test]
async fn test_batch_error_fans_out_to_all_waiters() {
    let target = Arc::new(RecordingTarget::failing());
    let batcher = batcher(target.clone());

    let mut handles = Vec::new();
    for _ in 0..5 {
        let batcher = batcher.clone();
        handles.push(tokio::spawn(async move {
            batcher.get(ListQuery::default()).await
        }));
    }

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.code, crate::rpc::Code::Internal);
    }
    assert_eq!(target.call_count(), 1);
}

#[tokio::test]
async fn test_sequential_batches_each_call_downstream() {
    let target = Arc::new(RecordingTarget::new());
    let batcher = batcher(target.clone());

    batcher.get(ListQuery::default()).await.unwrap();
    batcher.get(ListQuery::default()).await.unwrap();

    assert_eq!(target.call_count(), 2);
}

#[tokio::test]
async fn test_cancelled_last_waiter_cancels_the_batch() {
    let target = Arc::new(RecordingTarget::new());
    let batcher = batcher(target.clone());

    let handle = tokio::spawn({
        let batcher = batcher.clone();
        async move { batcher.get(ListQuery::default()).await }
    });

    // Let the waiter register, then abandon it before the window closes.
    tokio::time::sleep(Duration::from_millis(5)).await;
    handle.abort();

    // Well past the window: no downstream call was made for the empty batch.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(target.call_count(), 0);
}

#[tokio::test]
async fn test_cancelled_waiter_does_not_starve_the_rest() {
    let target = Arc::new(RecordingTarget::new());
    let batcher = batcher(target.clone());

    let doomed = tokio::spawn({
        let batcher = batcher.clone();
        async move { batcher.get(ListQuery::default()).await }
    });
    let survivor = tokio::spawn({
        let batcher = batcher.clone();
        async move { batcher.get(ListQuery::default()).await }
    });

    tokio::time::sleep(Duration::from_millis(5)).await;
    doomed.abort();

    survivor.await.unwrap().unwrap();
    assert_eq!(target.call_count(), 1);
}

#[tokio::test]
async fn test_batch_uses_the_batch_query() {
    let target = Arc::new(RecordingTarget::new());
    let batcher = batcher(target.clone());

    let query = ListQuery {
        skip: 30,
        limit: 15,
        ..ListQuery::default()
    };
    batcher.get(query.clone()).await.unwrap();

    let queries = target.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].skip, 30);
    assert_eq!(queries[0].limit, 15);
}
