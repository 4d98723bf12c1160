//! Gateway request handlers.

pub mod book;
pub mod borrow;
pub mod collection;

use libris_domain::ObjectId;

use super::envelope::ApiFailure;

/// Parses a path id, turning malformed input into a 400 at the edge.
pub(crate) fn parse_id(raw: &str) -> Result<ObjectId, ApiFailure> {
    raw.parse()
        .map_err(|_| ApiFailure::bad_request(format!("invalid id: {raw}")))
}
