//! Books: single physical copies, the unit of borrow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ObjectId;

/// One physical copy belonging to exactly one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: ObjectId,
    pub collection_id: ObjectId,
    pub is_borrowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Creates a new available copy for the given collection.
    pub fn new(collection_id: ObjectId) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            collection_id,
            is_borrowed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a book. Absent fields are left untouched.
///
/// Setting `is_borrowed = true` through the book service is a conditional
/// write: it only succeeds on a copy that is currently available.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    pub collection_id: Option<ObjectId>,
    pub is_borrowed: Option<bool>,
}

impl BookPatch {
    /// Patch that only flips the borrowed flag.
    pub fn borrowed(value: bool) -> Self {
        Self {
            collection_id: None,
            is_borrowed: Some(value),
        }
    }
}
