//! The read batcher itself.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::debug;

use libris_storage::ListQuery;

use super::types::{BatchTarget, DEFAULT_BATCH_WINDOW};
use crate::rpc::Status;

struct Waiter<R> {
    id: u64,
    tx: oneshot::Sender<Result<R, Status>>,
}

/// One open batch: the waiters collected so far and the timer that will
/// flush them.
struct BatchSlot<R> {
    query: ListQuery,
    waiters: Vec<Waiter<R>>,
    timer: AbortHandle,
}

type Slots<R> = Mutex<HashMap<String, BatchSlot<R>>>;

/// Coalesces identical concurrent list reads into one downstream call.
///
/// On arrival a request joins (or opens) the pending list for its query
/// fingerprint; opening a list arms a one-shot timer for the window. When
/// the timer fires, the list is detached under the lock and exactly one
/// downstream call is made outside it; every waiter receives a clone of the
/// same payload or the same error.
///
/// Waiter cancellation is honored: a dropped waiter removes itself from the
/// pending list, and the last one out cancels the timer so no downstream
/// call happens for an empty batch.
pub struct ReadBatcher<T: BatchTarget> {
    target: Arc<T>,
    window: Duration,
    slots: Arc<Slots<T::Reply>>,
    next_waiter: AtomicU64,
}

impl<T: BatchTarget> ReadBatcher<T> {
    pub fn new(target: Arc<T>) -> Self {
        Self::with_window(target, DEFAULT_BATCH_WINDOW)
    }

    pub fn with_window(target: Arc<T>, window: Duration) -> Self {
        Self {
            target,
            window,
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_waiter: AtomicU64::new(0),
        }
    }

    /// Joins the batch for this query and waits for its shared result.
    pub async fn get(&self, query: ListQuery) -> Result<T::Reply, Status> {
        let fingerprint = query.fingerprint();
        let waiter_id = self.next_waiter.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        {
            let mut slots = self.slots.lock().expect("batcher lock poisoned");
            match slots.entry(fingerprint.clone()) {
                Entry::Occupied(mut occupied) => {
                    occupied.get_mut().waiters.push(Waiter { id: waiter_id, tx });
                }
                Entry::Vacant(vacant) => {
                    let timer = tokio::spawn({
                        let slots = Arc::clone(&self.slots);
                        let target = Arc::clone(&self.target);
                        let fingerprint = fingerprint.clone();
                        let window = self.window;
                        async move {
                            tokio::time::sleep(window).await;
                            flush(slots, target, &fingerprint).await;
                        }
                    })
                    .abort_handle();
                    vacant.insert(BatchSlot {
                        query,
                        waiters: vec![Waiter { id: waiter_id, tx }],
                        timer,
                    });
                }
            }
        }

        let guard = WaiterGuard {
            slots: Arc::clone(&self.slots),
            fingerprint,
            waiter_id,
            disarmed: false,
        };
        let outcome = rx.await;
        guard.disarm();

        match outcome {
            Ok(result) => result,
            // The flush task died before fanning out; nothing was sent
            // downstream on our behalf that we know of.
            Err(_) => Err(Status::internal("batched read dropped before completion")),
        }
    }
}

/// Detaches the pending list and makes the single downstream call.
async fn flush<T: BatchTarget>(slots: Arc<Slots<T::Reply>>, target: Arc<T>, fingerprint: &str) {
    let slot = {
        let mut slots = slots.lock().expect("batcher lock poisoned");
        slots.remove(fingerprint)
    };
    let Some(slot) = slot else { return };

    debug!(waiters = slot.waiters.len(), "flushing batched read");
    metrics::counter!("libris_batch_downstream_calls_total").increment(1);
    metrics::counter!("libris_batched_reads_total").increment(slot.waiters.len() as u64);

    let result = target.fetch(&slot.query).await;
    for waiter in slot.waiters {
        // A waiter that gave up while we were downstream is just gone.
        let _ = waiter.tx.send(result.clone());
    }
}

/// Removes a cancelled waiter from its pending list; the last one out
/// cancels the batch timer.
struct WaiterGuard<R> {
    slots: Arc<Slots<R>>,
    fingerprint: String,
    waiter_id: u64,
    disarmed: bool,
}

impl<R> WaiterGuard<R> {
    fn disarm(mut self) {
        self.disarmed = true;
    }
}

impl<R> Drop for WaiterGuard<R> {
    fn drop(&mut self) {
        if self.disarmed {
            return;
        }
        let Ok(mut slots) = self.slots.lock() else {
            return;
        };
        if let Some(slot) = slots.get_mut(&self.fingerprint) {
            slot.waiters.retain(|w| w.id != self.waiter_id);
            if slot.waiters.is_empty() {
                slot.timer.abort();
                slots.remove(&self.fingerprint);
            }
        }
    }
}
