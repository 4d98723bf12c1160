//! Borrow coordinator.
//!
//! Both workflows run without a distributed transaction: every step is
//! idempotent-by-id or compensable by an inverse call, and the committed
//! prefix is unwound in reverse order when a later step fails. The cache
//! finalization steps are hints and never fail a workflow.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use libris_domain::cache::AvailableBookIndex;
use libris_domain::{BookPatch, Borrow, ObjectId};
use libris_storage::{BorrowStore, StorageError};

use crate::compensation::Compensations;
use crate::rpc::{BookApi, BorrowApi, BorrowReply, Code, CollectionApi, Status};

/// Orchestrates the multi-service borrow/return workflows.
///
/// Holds pre-built clients to the collection and book services and its own
/// handle on the available-book index for the cache finalization steps.
pub struct BorrowService {
    store: Arc<dyn BorrowStore>,
    collections: Arc<dyn CollectionApi>,
    books: Arc<dyn BookApi>,
    index: AvailableBookIndex,
}

impl BorrowService {
    pub fn new(
        store: Arc<dyn BorrowStore>,
        collections: Arc<dyn CollectionApi>,
        books: Arc<dyn BookApi>,
        index: AvailableBookIndex,
    ) -> Self {
        Self {
            store,
            collections,
            books,
            index,
        }
    }
}

#[async_trait]
impl BorrowApi for BorrowService {
    async fn borrow(
        &self,
        collection_id: &ObjectId,
        user_id: &ObjectId,
    ) -> Result<BorrowReply, Status> {
        // Step 1: collection lookup and book reservation in parallel.
        let (collection_res, reserve_res) = tokio::join!(
            self.collections.find_by_id(collection_id),
            self.books.get_available(collection_id),
        );

        let book = match (collection_res, reserve_res) {
            (Ok(_), Ok(book)) => book,
            (Err(status), Ok(book)) => {
                // The collection lookup failed but a reservation was taken;
                // hand the hint back before propagating.
                self.index.add(collection_id, &book.id).await;
                return Err(status);
            }
            // Collection errors take precedence when both legs fail.
            (Err(status), Err(_)) | (Ok(_), Err(status)) => return Err(status),
        };

        let mut comps = Compensations::new();
        {
            let index = self.index.clone();
            let collection_id = collection_id.clone();
            let book_id = book.id.clone();
            comps.push("release-reservation", move || async move {
                index.add(&collection_id, &book_id).await;
            });
        }

        // Step 2: mark the copy borrowed. Skipped when the reservation
        // already observed it borrowed (concurrent reserve); the write is
        // conditional, so a racing borrow fails here instead of
        // double-borrowing the copy.
        if !book.is_borrowed {
            match self.books.update(&book.id, BookPatch::borrowed(true)).await {
                Ok(_) => {
                    let books = self.books.clone();
                    let book_id = book.id.clone();
                    comps.push("unmark-borrowed", move || async move {
                        if let Err(error) =
                            books.update(&book_id, BookPatch::borrowed(false)).await
                        {
                            warn!(%book_id, %error, "failed to revert borrowed flag");
                        }
                    });
                }
                Err(status) if status.code == Code::Aborted => {
                    // Lost the race: the copy is genuinely taken, so the
                    // reservation must not be released back into the index.
                    comps.commit();
                    self.index.remove(collection_id, &book.id).await;
                    return Err(status);
                }
                Err(status) => {
                    comps.unwind().await;
                    return Err(Status::aborted(format!(
                        "failed to mark book as borrowed: {status}"
                    )));
                }
            }
        }

        // Step 3: create the borrow record.
        let borrow = Borrow::new(book.id.clone(), user_id.clone(), collection_id.clone());
        if let Err(error) = self.store.insert(borrow.clone()).await {
            warn!(book_id = %book.id, %error, "borrow insert failed, compensating");
            comps.unwind().await;
            return Err(Status::internal(format!(
                "failed to create borrow record: {error}"
            )));
        }
        comps.commit();

        // Step 4: finalize the cache. Idempotent; a no-op when the
        // reservation already popped the id.
        self.index.remove(collection_id, &book.id).await;

        info!(borrow_id = %borrow.id, book_id = %book.id, %collection_id, "book borrowed");
        Ok(BorrowReply::new("Book borrowed!", &borrow))
    }

    async fn return_book(&self, borrow_id: &ObjectId) -> Result<BorrowReply, Status> {
        // Step 1: load and guard the state machine. This read of
        // `return_date` is the only OPEN -> CLOSED enforcement point.
        let borrow = match self.store.find_by_id(borrow_id).await {
            Ok(borrow) => borrow,
            Err(StorageError::NotFound { .. }) => {
                return Err(Status::not_found("Borrow record not found"));
            }
            Err(error) => return Err(error.into()),
        };
        if borrow.is_returned() {
            return Err(Status::failed_precondition("Book already returned"));
        }

        // Step 2: mark the copy available again. Step 1 was read-only, so
        // there is nothing to compensate on failure.
        if let Err(status) = self
            .books
            .update(&borrow.book_id, BookPatch::borrowed(false))
            .await
        {
            return Err(Status::aborted(format!(
                "failed to mark book as returned: {status}"
            )));
        }

        // Step 3: close the record.
        let closed = match self.store.close(&borrow.id, Utc::now()).await {
            Ok(closed) => closed,
            Err(error) => {
                warn!(%borrow_id, %error, "borrow close failed, re-marking book borrowed");
                if let Err(revert) = self
                    .books
                    .update(&borrow.book_id, BookPatch::borrowed(true))
                    .await
                {
                    warn!(book_id = %borrow.book_id, %revert, "compensation failed");
                }
                return Err(Status::internal(format!(
                    "failed to update borrow record: {error}"
                )));
            }
        };

        // Step 4: the copy is reservable again. Failures are hint-only.
        self.index.add(&borrow.collection_id, &borrow.book_id).await;

        info!(%borrow_id, book_id = %borrow.book_id, "book returned");
        Ok(BorrowReply::new("Book returned successfully", &closed))
    }
}
