//! CancelSubscriptionHandler - Command handler for immediate cancellation.

use std::sync::Arc;

use crate::application::environments::PaymentEnvironments;
use crate::domain::billing::BillingError;
use crate::ports::{EntitlementStore, Subscription};

/// Command to cancel an email's active subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub origin: Option<String>,
    pub email: String,
}

/// Result of a cancellation.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub canceled: Subscription,
}

/// Handler for canceling a customer's active subscription.
///
/// The provider is the source of truth for which subscription is active:
/// the stored subscription id may be stale, so the handler lists the
/// customer's active subscriptions and cancels the current one.
pub struct CancelSubscriptionHandler {
    environments: Arc<PaymentEnvironments>,
    store: Arc<dyn EntitlementStore>,
}

impl CancelSubscriptionHandler {
    pub fn new(environments: Arc<PaymentEnvironments>, store: Arc<dyn EntitlementStore>) -> Self {
        Self {
            environments,
            store,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
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

        let active = env
            .provider
            .list_active_subscriptions(&record.customer_id)
            .await?;
        let current = active
            .first()
            .ok_or_else(|| BillingError::not_found(&cmd.email))?;

        let canceled = env.provider.cancel_subscription(&current.id).await?;

        tracing::info!(
            subscription_id = %canceled.id,
            environment = env.environment.as_str(),
            "subscription canceled"
        );

        Ok(CancelSubscriptionResult { canceled })
    }
}
