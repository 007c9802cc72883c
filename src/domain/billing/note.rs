//! Pre-checkout note.
//!
//! Fire-and-forget record of checkout intent, captured before the Stripe
//! round-trip for drop-off analytics. Insert-only; nothing in this service
//! reads it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of a user reaching the checkout step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCheckoutNote {
    /// Internal identifier.
    pub id: Uuid,

    /// Caller-supplied user identifier.
    pub user_id: String,

    /// Caller-supplied display name.
    pub user_name: String,

    /// Customer email.
    pub email: String,

    /// Client-reported date of the checkout attempt, stored verbatim.
    pub date: String,

    /// Opaque caller payload.
    pub iq_value: Option<String>,

    /// When the note was recorded server-side.
    pub recorded_at: DateTime<Utc>,
}

impl PreCheckoutNote {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        email: impl Into<String>,
        date: impl Into<String>,
        iq_value: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            email: email.into(),
            date: date.into(),
            iq_value,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assigns_unique_ids() {
        let a = PreCheckoutNote::new("u1", "Ada", "ada@example.com", "2026-08-30", None);
        let b = PreCheckoutNote::new("u1", "Ada", "ada@example.com", "2026-08-30", None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn new_stores_fields_verbatim() {
        let note = PreCheckoutNote::new(
            "usr_9",
            "Grace",
            "grace@example.com",
            "not-even-a-date",
            Some("141".to_string()),
        );
        assert_eq!(note.date, "not-even-a-date");
        assert_eq!(note.iq_value.as_deref(), Some("141"));
    }
}
