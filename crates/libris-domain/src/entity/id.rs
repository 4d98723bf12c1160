//! Document identifiers.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of raw bytes in an identifier; rendered as 24 hex characters.
const ID_BYTES: usize = 12;

/// Error returned when parsing an identifier from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid object id: {value}")]
pub struct ParseIdError {
    pub value: String,
}

/// A 24-character lowercase hex document identifier.
///
/// Every persisted row (collection, book, borrow record) is keyed by one of
/// these. New ids are generated from random bytes; parsing validates length
/// and the hex alphabet so malformed ids are rejected at the edge instead of
/// deep inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let mut out = String::with_capacity(ID_BYTES * 2);
        for b in bytes {
            out.push_str(&format!("{b:02x}"));
        }
        Self(out)
    }

    /// Returns the id as a hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == ID_BYTES * 2
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(ParseIdError {
                value: s.to_string(),
            })
        }
    }
}

impl TryFrom<String> for ObjectId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}
