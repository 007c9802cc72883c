//! Entitlement record aggregate.
//!
//! One record per checkout attempt. The Stripe checkout session id is the
//! record's identity; the customer email is the key every reconciliation
//! and entitlement query joins on, so at most one record is authoritative
//! per email (unique constraint enforced by the store).
//!
//! # Invariants
//!
//! - `status` only moves forward: `Pending` -> `Completed`
//! - `customer_id` is immutable once set
//! - Reconciliation may only touch `status` and `subscription_id`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementStatus {
    /// Checkout session created, payment not yet confirmed.
    Pending,

    /// Provider reported the checkout as completed. Terminal.
    Completed,
}

impl EntitlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementStatus::Pending => "pending",
            EntitlementStatus::Completed => "completed",
        }
    }
}

/// Durable record of one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    /// Stripe checkout session id (cs_...). Storage primary key.
    pub id: String,

    /// Caller-supplied user identifier.
    pub user_id: String,

    /// Caller-supplied display name.
    pub user_name: String,

    /// Customer email. Reconciliation join key, unique per record.
    pub email: String,

    /// Opaque caller payload, stored verbatim and never interpreted.
    pub iq_value: Option<String>,

    /// Total amount of the priced offer at creation time, in cents.
    pub amount_total: Option<i64>,

    /// Subtotal before discounts, in cents.
    pub amount_subtotal: Option<i64>,

    /// Currency of the offer (lowercase ISO code).
    pub currency: Option<String>,

    /// Payment method types offered by the session.
    pub payment_method_types: Vec<String>,

    /// Session mode (always "subscription" for this service).
    pub mode: String,

    /// Stripe subscription id. Set at orchestration time, confirmed or
    /// overwritten by the webhook's correlation token.
    pub subscription_id: Option<String>,

    /// Stripe customer id. Immutable once set.
    pub customer_id: String,

    /// Lifecycle state.
    pub status: EntitlementStatus,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl EntitlementRecord {
    /// Check whether this record grants an entitlement.
    ///
    /// Only a reconciled record entitles: the provider must have reported
    /// the checkout as completed and left a subscription behind. A pending
    /// record means a session was opened, not that payment ever happened,
    /// so an abandoned checkout never grants access.
    pub fn has_entitlement(&self) -> bool {
        self.status == EntitlementStatus::Completed && self.subscription_id.is_some()
    }

    /// Apply a completed-checkout event reported by the provider.
    ///
    /// Sets the subscription id to the provider's authoritative value and
    /// moves the record to `Completed`. The transition target is the same
    /// from either starting state, so reapplying the same event is a no-op.
    pub fn complete(&mut self, subscription_id: impl Into<String>) {
        self.subscription_id = Some(subscription_id.into());
        self.status = EntitlementStatus::Completed;
    }

    /// Whether the record has reached its terminal state.
    pub fn is_completed(&self) -> bool {
        self.status == EntitlementStatus::Completed
    }
}
