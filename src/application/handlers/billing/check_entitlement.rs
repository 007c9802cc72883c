//! CheckEntitlementHandler - Query handler for subscription status.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::ports::EntitlementStore;

/// Query for an email's entitlement status.
#[derive(Debug, Clone)]
pub struct CheckEntitlementQuery {
    pub email: String,
}

/// Entitlement status for an email.
#[derive(Debug, Clone)]
pub struct CheckEntitlementResult {
    pub has_subscription: bool,
}

/// Handler answering "does this email have a subscription".
///
/// Reads the local store only; the provider is never consulted, so the
/// answer reflects what reconciliation has recorded.
pub struct CheckEntitlementHandler {
    store: Arc<dyn EntitlementStore>,
}

impl CheckEntitlementHandler {
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: CheckEntitlementQuery,
    ) -> Result<CheckEntitlementResult, BillingError> {
        let record = self
            .store
            .find_by_email(&query.email)
            .await?
            .ok_or_else(|| BillingError::not_found(&query.email))?;

        Ok(CheckEntitlementResult {
            has_subscription: record.has_entitlement(),
        })
    }
}
