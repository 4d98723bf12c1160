//! Query-parameter parsing for list reads.
//!
//! Recognized parameters: `page`, `skip`, `limit` (capped at
//! [`MAX_LIMIT`]), repeatable `filter[field]=value`, and
//! `sort=field1,-field2` with `-` marking descending order.

use libris_storage::{ListQuery, SortKey, MAX_LIMIT};

/// Builds a [`ListQuery`] from raw query pairs. Unknown or malformed
/// parameters are ignored rather than rejected.
pub fn parse_list_query(pairs: &[(String, String)]) -> ListQuery {
    let mut query = ListQuery::default();

    // Limit first: page-based skip depends on the effective page size.
    if let Some(limit) = value_of(pairs, "limit").and_then(|v| v.parse::<u64>().ok()) {
        if limit > 0 && limit <= MAX_LIMIT {
            query.limit = limit;
        }
    }

    if let Some(page) = value_of(pairs, "page").and_then(|v| v.parse::<u64>().ok()) {
        if page > 0 {
            query.skip = (page - 1) * query.limit;
        }
    }

    // An explicit skip wins over page arithmetic.
    if let Some(skip) = value_of(pairs, "skip").and_then(|v| v.parse::<u64>().ok()) {
        query.skip = skip;
    }

    for (key, value) in pairs {
        if let Some(field) = key
            .strip_prefix("filter[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            if !field.is_empty() && !value.is_empty() {
                query
                    .filter
                    .insert(field.to_string(), serde_json::Value::String(value.clone()));
            }
        }
    }

    if let Some(sort) = value_of(pairs, "sort") {
        for field in sort.split(',') {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            match field.strip_prefix('-') {
                Some(name) if !name.is_empty() => query.sort.push(SortKey::desc(name)),
                Some(_) => {}
                None => query.sort.push(SortKey::asc(field)),
            }
        }
    }

    query
}

fn value_of<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
