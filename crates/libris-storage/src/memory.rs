//! In-memory store implementations.
//!
//! Rows live in `DashMap`s keyed by id; per-row mutation goes through the
//! map's entry/get_mut API so conditional writes (claim) and counter
//! increments (adjust_stock) are atomic per row, matching what a document
//! store guarantees per document. List reads are linear scans with
//! JSON-value filtering, which is plenty for tests and single-process use.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use libris_domain::{Book, BookPatch, Borrow, Collection, CollectionPatch, ObjectId};

use crate::error::{StorageError, StorageResult};
use crate::query::{ListQuery, SortKey};
use crate::traits::{BookStore, BorrowStore, CollectionStore};

/// Applies filter, sort and pagination to already id-ordered rows.
fn apply_query<T: Serialize + Clone>(rows: Vec<T>, query: &ListQuery) -> StorageResult<Vec<T>> {
    let mut keyed: Vec<(T, serde_json::Value)> = Vec::with_capacity(rows.len());
    for row in rows {
        let value = serde_json::to_value(&row).map_err(|e| StorageError::Serialization {
            message: e.to_string(),
        })?;
        keyed.push((row, value));
    }

    keyed.retain(|(_, value)| matches_filter(value, &query.filter));

    if !query.sort.is_empty() {
        keyed.sort_by(|(_, a), (_, b)| compare_by_keys(a, b, &query.sort));
    }

    let skipped = keyed.into_iter().skip(query.skip as usize);
    let rows = if query.limit > 0 {
        skipped.take(query.limit as usize).map(|(row, _)| row).collect()
    } else {
        skipped.map(|(row, _)| row).collect()
    };
    Ok(rows)
}

fn matches_filter(value: &serde_json::Value, filter: &BTreeMap<String, serde_json::Value>) -> bool {
    filter.iter().all(|(field, expected)| {
        match value.get(field) {
            Some(actual) => json_eq(actual, expected),
            None => false,
        }
    })
}

/// Loose equality: numbers compare numerically, everything else strictly.
/// Query-string filters arrive as strings, so `"true"`/`"false"` also match
/// booleans and numeric strings match numbers.
fn json_eq(actual: &serde_json::Value, expected: &serde_json::Value) -> bool {
    use serde_json::Value;

    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::Number(a), Value::String(e)) => e.parse::<f64>().is_ok_and(|e| {
            a.as_f64().is_some_and(|a| (a - e).abs() < f64::EPSILON)
        }),
        (Value::Bool(a), Value::String(e)) => e.parse::<bool>().is_ok_and(|e| *a == e),
        _ => false,
    }
}

fn compare_by_keys(a: &serde_json::Value, b: &serde_json::Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = compare_json(a.get(&key.field), b.get(&key.field));
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_json(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    use serde_json::Value;

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        },
    }
}

/// In-memory [`CollectionStore`].
#[derive(Debug, Default)]
pub struct MemoryCollectionStore {
    rows: DashMap<ObjectId, Collection>,
}

impl MemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ordered_rows(&self) -> Vec<Collection> {
        let mut rows: Vec<Collection> = self.rows.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        rows
    }
}

#[async_trait]
impl CollectionStore for MemoryCollectionStore {
    async fn list(&self, query: &ListQuery) -> StorageResult<Vec<Collection>> {
        apply_query(self.ordered_rows(), query)
    }

    async fn find_by_id(&self, id: &ObjectId) -> StorageResult<Collection> {
        self.rows
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StorageError::NotFound {
                entity: "collection",
                id: id.to_string(),
            })
    }

    async fn exists_by_name_author(
        &self,
        name: &str,
        author: &str,
        exclude: Option<&ObjectId>,
    ) -> StorageResult<bool> {
        Ok(self.rows.iter().any(|r| {
            r.name == name && r.author == author && exclude != Some(&r.id)
        }))
    }

    async fn insert(&self, collection: Collection) -> StorageResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.rows.entry(collection.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::Duplicate {
                entity: "collection",
                key: collection.id.to_string(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(collection);
                Ok(())
            }
        }
    }

    async fn update(&self, id: &ObjectId, patch: CollectionPatch) -> StorageResult<Collection> {
        let mut row = self.rows.get_mut(id).ok_or_else(|| StorageError::NotFound {
            entity: "collection",
            id: id.to_string(),
        })?;
        patch.apply(&mut row);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: &ObjectId) -> StorageResult<Collection> {
        self.rows
            .remove(id)
            .map(|(_, row)| row)
            .ok_or_else(|| StorageError::NotFound {
                entity: "collection",
                id: id.to_string(),
            })
    }

    async fn adjust_stock(&self, id: &ObjectId, delta: i64) -> StorageResult<Collection> {
        let mut row = self.rows.get_mut(id).ok_or_else(|| StorageError::NotFound {
            entity: "collection",
            id: id.to_string(),
        })?;
        row.total_books += delta;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

/// In-memory [`BookStore`].
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    rows: DashMap<ObjectId, Book>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ordered_rows(&self) -> Vec<Book> {
        let mut rows: Vec<Book> = self.rows.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        rows
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn list(&self, query: &ListQuery) -> StorageResult<Vec<Book>> {
        apply_query(self.ordered_rows(), query)
    }

    async fn find_by_id(&self, id: &ObjectId) -> StorageResult<Book> {
        self.rows
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StorageError::NotFound {
                entity: "book",
                id: id.to_string(),
            })
    }

    async fn find_available(&self, collection_id: &ObjectId) -> StorageResult<Book> {
        self.ordered_rows()
            .into_iter()
            .find(|b| &b.collection_id == collection_id && !b.is_borrowed)
            .ok_or_else(|| StorageError::NotFound {
                entity: "available book",
                id: collection_id.to_string(),
            })
    }

    async fn insert(&self, book: Book) -> StorageResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.rows.entry(book.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::Duplicate {
                entity: "book",
                key: book.id.to_string(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(book);
                Ok(())
            }
        }
    }

    async fn update(&self, id: &ObjectId, patch: BookPatch) -> StorageResult<Book> {
        let mut row = self.rows.get_mut(id).ok_or_else(|| StorageError::NotFound {
            entity: "book",
            id: id.to_string(),
        })?;
        if let Some(collection_id) = patch.collection_id {
            row.collection_id = collection_id;
        }
        if let Some(is_borrowed) = patch.is_borrowed {
            row.is_borrowed = is_borrowed;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: &ObjectId) -> StorageResult<Book> {
        self.rows
            .remove(id)
            .map(|(_, row)| row)
            .ok_or_else(|| StorageError::NotFound {
                entity: "book",
                id: id.to_string(),
            })
    }

    async fn claim(&self, id: &ObjectId) -> StorageResult<Book> {
        let mut row = self.rows.get_mut(id).ok_or_else(|| StorageError::NotFound {
            entity: "book",
            id: id.to_string(),
        })?;
        if row.is_borrowed {
            return Err(StorageError::PreconditionFailed {
                entity: "book",
                id: id.to_string(),
                message: "already borrowed".to_string(),
            });
        }
        row.is_borrowed = true;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn release(&self, id: &ObjectId) -> StorageResult<Book> {
        let mut row = self.rows.get_mut(id).ok_or_else(|| StorageError::NotFound {
            entity: "book",
            id: id.to_string(),
        })?;
        row.is_borrowed = false;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn count(&self, collection_id: &ObjectId) -> StorageResult<u64> {
        Ok(self
            .rows
            .iter()
            .filter(|r| &r.collection_id == collection_id)
            .count() as u64)
    }

    async fn bulk_insert(&self, books: Vec<Book>) -> StorageResult<()> {
        for book in books {
            self.insert(book).await?;
        }
        Ok(())
    }
}

/// In-memory [`BorrowStore`].
#[derive(Debug, Default)]
pub struct MemoryBorrowStore {
    rows: DashMap<ObjectId, Borrow>,
}

impl MemoryBorrowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, for test assertions.
    pub fn all(&self) -> Vec<Borrow> {
        self.rows.iter().map(|r| r.value().clone()).collect()
    }
}

#[async_trait]
impl BorrowStore for MemoryBorrowStore {
    async fn find_by_id(&self, id: &ObjectId) -> StorageResult<Borrow> {
        self.rows
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StorageError::NotFound {
                entity: "borrow",
                id: id.to_string(),
            })
    }

    async fn insert(&self, borrow: Borrow) -> StorageResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.rows.entry(borrow.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::Duplicate {
                entity: "borrow",
                key: borrow.id.to_string(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(borrow);
                Ok(())
            }
        }
    }

    async fn close(&self, id: &ObjectId, returned_at: DateTime<Utc>) -> StorageResult<Borrow> {
        let mut row = self.rows.get_mut(id).ok_or_else(|| StorageError::NotFound {
            entity: "borrow",
            id: id.to_string(),
        })?;
        row.return_date = Some(returned_at);
        row.updated_at = returned_at;
        Ok(row.clone())
    }
}
