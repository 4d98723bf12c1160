//! Bounded background retry.
//!
//! Book writes keep `collection.total_books` only eventually consistent:
//! the adjustment runs detached from the caller with a fresh budget, a few
//! attempts, and nothing past that but a log line. There is no dead-letter
//! queue; exhaustion is accepted data loss on a counter that the next
//! quiescent reconciliation can repair.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::rpc::Status;

/// Budget for one whole background task, attempts included.
pub const BACKGROUND_BUDGET: Duration = Duration::from_secs(5);

/// Attempts before giving up.
pub const BACKGROUND_ATTEMPTS: u32 = 3;

/// Spawns `op` on a detached task with a fresh [`BACKGROUND_BUDGET`],
/// retrying up to [`BACKGROUND_ATTEMPTS`] times.
///
/// The budget is independent of the caller's deadline: the caller has
/// already answered by the time this runs. Failures are never surfaced,
/// only logged. The handle is returned so tests can await completion.
pub fn spawn_with_retries<F, Fut>(task: &'static str, op: F) -> JoinHandle<()>
where
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Status>> + Send + 'static,
{
    tokio::spawn(async move {
        let attempts = async {
            for attempt in 1..=BACKGROUND_ATTEMPTS {
                match op(attempt).await {
                    Ok(()) => return true,
                    Err(status) => {
                        warn!(task, attempt, error = %status, "background attempt failed");
                    }
                }
            }
            false
        };

        match tokio::time::timeout(BACKGROUND_BUDGET, attempts).await {
            Ok(true) => {}
            Ok(false) => {
                error!(task, attempts = BACKGROUND_ATTEMPTS, "background task exhausted retries");
            }
            Err(_) => {
                error!(task, budget_secs = BACKGROUND_BUDGET.as_secs(), "background task exceeded budget");
            }
        }
    })
}
