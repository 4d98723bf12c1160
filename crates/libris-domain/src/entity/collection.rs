//! Collections: groups of identical book copies with aggregate counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ObjectId;

/// A logical group of identical book copies (same title/author).
///
/// `total_books` is the authoritative count of book rows belonging to the
/// collection; `available_books` counts those not currently borrowed. Both
/// are maintained by the stock-adjustment cascade and only guaranteed exact
/// when the system is quiescent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: ObjectId,
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub total_books: i64,
    pub available_books: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    /// Creates a new collection with freshly stamped id and timestamps.
    ///
    /// All copies start available, so `available_books` mirrors
    /// `total_books` at creation time.
    pub fn new(
        name: impl Into<String>,
        author: impl Into<String>,
        categories: Vec<String>,
        total_books: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            name: name.into(),
            author: author.into(),
            categories,
            total_books,
            available_books: total_books,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a collection. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionPatch {
    pub name: Option<String>,
    pub author: Option<String>,
    pub categories: Option<Vec<String>>,
    pub total_books: Option<i64>,
    pub available_books: Option<i64>,
}

impl CollectionPatch {
    /// Applies the present fields onto `collection`. Timestamps are the
    /// store's responsibility.
    pub fn apply(&self, collection: &mut Collection) {
        if let Some(name) = &self.name {
            collection.name = name.clone();
        }
        if let Some(author) = &self.author {
            collection.author = author.clone();
        }
        if let Some(categories) = &self.categories {
            collection.categories = categories.clone();
        }
        if let Some(total_books) = self.total_books {
            collection.total_books = total_books;
        }
        if let Some(available_books) = self.available_books {
            collection.available_books = available_books;
        }
    }
}
