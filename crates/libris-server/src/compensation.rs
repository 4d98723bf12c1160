//! Compensation stack for multi-step workflows.
//!
//! The borrow workflow never opens a cross-store transaction; every step is
//! either idempotent-by-id or compensable by an inverse call. As each step
//! commits, its undo action is pushed here; when a later step fails, the
//! recorded prefix is unwound in reverse order. The step list is plain data
//! so tests can drive any failure point and observe the exact unwind.

use futures::future::BoxFuture;
use tracing::debug;

type Undo = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Accumulated undo actions for the committed prefix of a workflow.
#[derive(Default)]
pub struct Compensations {
    steps: Vec<(&'static str, Undo)>,
}

impl Compensations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the undo action for a step that just committed.
    pub fn push<F, Fut>(&mut self, step: &'static str, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.steps
            .push((step, Box::new(move || Box::pin(undo()) as BoxFuture<'static, ()>)));
    }

    /// Names of the recorded steps, in commit order.
    pub fn steps(&self) -> Vec<&'static str> {
        self.steps.iter().map(|(name, _)| *name).collect()
    }

    /// The workflow reached its commit point; recorded undos are dropped
    /// without running.
    pub fn commit(mut self) {
        self.steps.clear();
    }

    /// Runs the recorded undo actions in reverse commit order.
    ///
    /// Undo actions are best-effort: each is responsible for logging its own
    /// failure, and a failed undo never stops the ones before it.
    pub async fn unwind(mut self) {
        while let Some((step, undo)) = self.steps.pop() {
            debug!(step, "running compensation");
            undo().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_unwind_runs_in_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut comps = Compensations::new();

        for step in ["first", "second", "third"] {
            let order = order.clone();
            comps.push(step, move || async move {
                order.lock().unwrap().push(step);
            });
        }
        assert_eq!(comps.steps(), vec!["first", "second", "third"]);

        comps.unwind().await;
        assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_commit_drops_undos_without_running() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut comps = Compensations::new();
        let counter = ran.clone();
        comps.push("step", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        comps.commit();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_unwind_is_a_noop() {
        Compensations::new().unwind().await;
    }
}
