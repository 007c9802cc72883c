//! Entitlement store port.
//!
//! Contract for persisting entitlement records and pre-checkout notes.
//!
//! # Design
//!
//! - **Session id is the primary key**, email a unique secondary index;
//!   every entitlement query and reconciliation joins on email.
//! - **One authoritative record per email**: `save` upserts by email, so a
//!   repeat checkout replaces the previous attempt's record rather than
//!   accumulating duplicates.
//! - Records are never deleted by this service; retention is an external
//!   concern.

use async_trait::async_trait;

use crate::domain::billing::{BillingError, EntitlementRecord, PreCheckoutNote};

/// Store port for entitlement records.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Persist a new record, replacing any existing record for the same
    /// email (upsert by email).
    async fn save(&self, record: &EntitlementRecord) -> Result<(), BillingError>;

    /// Update an existing record in place (keyed by id).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record with this id exists.
    async fn update(&self, record: &EntitlementRecord) -> Result<(), BillingError>;

    /// Find the authoritative record for an email.
    async fn find_by_email(&self, email: &str)
        -> Result<Option<EntitlementRecord>, BillingError>;

    /// Insert a pre-checkout note (fire-and-forget analytics).
    async fn record_note(&self, note: &PreCheckoutNote) -> Result<(), BillingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn entitlement_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn EntitlementStore) {}
    }
}
