//! List-query shapes shared by stores, services and the gateway batcher.

use std::collections::BTreeMap;

use serde::Serialize;

/// Default page size for list queries.
pub const DEFAULT_LIMIT: u64 = 10;

/// Hard cap on the page size a caller may request.
pub const MAX_LIMIT: u64 = 100;

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Filter, sort and pagination for a list read.
///
/// The filter is a `BTreeMap` so its serialized form is deterministic,
/// which makes [`fingerprint`](Self::fingerprint) stable for identical
/// queries regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListQuery {
    pub filter: BTreeMap<String, serde_json::Value>,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: BTreeMap::new(),
            sort: Vec::new(),
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListQuery {
    /// Canonical key identifying this query for batching purposes.
    ///
    /// Two queries with the same filter, sort, skip and limit produce the
    /// same fingerprint; the batcher keeps one pending list per fingerprint.
    pub fn fingerprint(&self) -> String {
        // BTreeMap ordering plus field order makes this deterministic.
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!("skip={},limit={},sort={}", self.skip, self.limit, self.sort.len())
        })
    }
}
