//! CreatePortalSessionHandler - Command handler for opening the billing portal.

use std::sync::Arc;

use crate::application::environments::PaymentEnvironments;
use crate::domain::billing::BillingError;
use crate::ports::EntitlementStore;

/// Command to open a billing portal session for an existing customer.
#[derive(Debug, Clone)]
pub struct CreatePortalSessionCommand {
    pub origin: Option<String>,
    pub email: String,
}

/// Result carrying the hosted portal URL.
#[derive(Debug, Clone)]
pub struct CreatePortalSessionResult {
    pub url: String,
}

/// Handler for opening the provider's billing portal.
///
/// The portal is only reachable for emails with an entitlement record;
/// the stored customer id is what the provider session is created for.
pub struct CreatePortalSessionHandler {
    environments: Arc<PaymentEnvironments>,
    store: Arc<dyn EntitlementStore>,
}

impl CreatePortalSessionHandler {
    pub fn new(environments: Arc<PaymentEnvironments>, store: Arc<dyn EntitlementStore>) -> Self {
        Self {
            environments,
            store,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePortalSessionCommand,
    ) -> Result<CreatePortalSessionResult, BillingError> {
        let origin = cmd
            .origin
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .ok_or(BillingError::MissingOrigin)?;
        let env = self.environments.resolve(Some(origin))?;

        let record = self
            .store
            .find_by_email(&cmd.email)
            .await?
            .ok_or_else(|| BillingError::not_found(&cmd.email))?;

        let session = env
            .provider
            .create_portal_session(&record.customer_id, &format!("{}/#/home", origin))
            .await?;

        Ok(CreatePortalSessionResult { url: session.url })
    }
}
