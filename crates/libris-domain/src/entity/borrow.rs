//! Borrow records: one row per check-out.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::ObjectId;

/// Loan period granted on every borrow.
pub const BORROW_PERIOD_DAYS: i64 = 7;

/// A record of one check-out.
///
/// The record is open while `return_date` is `None` and transitions exactly
/// once to closed when it is set. Closed records are never reopened and
/// never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrow {
    pub id: ObjectId,
    pub book_id: ObjectId,
    pub user_id: ObjectId,
    pub collection_id: ObjectId,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Borrow {
    /// Creates an open borrow starting now, due in [`BORROW_PERIOD_DAYS`].
    pub fn new(book_id: ObjectId, user_id: ObjectId, collection_id: ObjectId) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            book_id,
            user_id,
            collection_id,
            borrow_date: now,
            due_date: now + Duration::days(BORROW_PERIOD_DAYS),
            return_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record has been closed.
    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_borrow_is_open_and_due_in_seven_days() {
        let b = Borrow::new(ObjectId::new(), ObjectId::new(), ObjectId::new());
        assert!(!b.is_returned());
        assert_eq!(b.due_date - b.borrow_date, Duration::days(7));
        assert!(b.due_date > b.borrow_date);
    }

    #[test]
    fn test_return_date_survives_serde() {
        let mut b = Borrow::new(ObjectId::new(), ObjectId::new(), ObjectId::new());
        b.return_date = Some(Utc::now());
        let json = serde_json::to_string(&b).unwrap();
        let back: Borrow = serde_json::from_str(&json).unwrap();
        assert!(back.is_returned());
    }
}
