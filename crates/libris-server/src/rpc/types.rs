//! Request and response shapes.

use serde::{Deserialize, Serialize};

use libris_domain::{Book, Borrow, Collection, ObjectId};

/// Client-supplied fields for a new collection; the service stamps id,
/// timestamps and the initial availability counter.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDraft {
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub total_books: i64,
}

/// Client-supplied fields for a new book.
#[derive(Debug, Clone, Deserialize)]
pub struct BookDraft {
    pub collection_id: ObjectId,
}

/// Envelope for collection list reads; the payload the batcher fans out.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReply {
    pub success: bool,
    pub message: String,
    pub collections: Vec<Collection>,
}

impl CollectionReply {
    pub fn new(message: impl Into<String>, collections: Vec<Collection>) -> Self {
        Self {
            success: true,
            message: message.into(),
            collections,
        }
    }
}

/// Envelope for book list reads.
#[derive(Debug, Clone, Serialize)]
pub struct BookReply {
    pub success: bool,
    pub message: String,
    pub books: Vec<Book>,
}

impl BookReply {
    pub fn new(message: impl Into<String>, books: Vec<Book>) -> Self {
        Self {
            success: true,
            message: message.into(),
            books,
        }
    }
}

/// Outcome of a borrow or return.
#[derive(Debug, Clone, Serialize)]
pub struct BorrowReply {
    pub success: bool,
    pub message: String,
    pub borrow_id: ObjectId,
    pub book_id: ObjectId,
}

impl BorrowReply {
    pub fn new(message: impl Into<String>, borrow: &Borrow) -> Self {
        Self {
            success: true,
            message: message.into(),
            borrow_id: borrow.id.clone(),
            book_id: borrow.book_id.clone(),
        }
    }
}
