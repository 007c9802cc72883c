//! CreateCheckoutHandler - Command handler for orchestrating a new checkout.

use std::sync::Arc;

use chrono::Utc;

use crate::application::environments::PaymentEnvironments;
use crate::domain::billing::{BillingError, EntitlementRecord, EntitlementStatus};
use crate::ports::{
    CreateCheckoutSessionRequest, CreateCustomerRequest, CreateSubscriptionRequest,
    EntitlementStore,
};

/// Command to orchestrate a checkout for a subscription purchase.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    /// Request origin, used for environment routing and redirect URLs.
    pub origin: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub price_id: String,
    /// Opaque caller payload, stored verbatim.
    pub iq_value: Option<String>,
}

/// Result of successful checkout orchestration.
#[derive(Debug, Clone)]
pub struct CreateCheckoutResult {
    /// Checkout session id handed back to the client for redirect.
    pub session_id: String,
}

/// Handler for orchestrating checkouts.
///
/// Runs the full provider-side setup (customer, discounted subscription,
/// checkout session) and persists a pending entitlement record carrying
/// the session's priced-offer snapshot. The record completes when the
/// webhook confirms payment.
pub struct CreateCheckoutHandler {
    environments: Arc<PaymentEnvironments>,
    store: Arc<dyn EntitlementStore>,
}

impl CreateCheckoutHandler {
    pub fn new(environments: Arc<PaymentEnvironments>, store: Arc<dyn EntitlementStore>) -> Self {
        Self {
            environments,
            store,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, BillingError> {
        // 1. Resolve the Stripe environment; fails closed without an origin
        let origin = cmd
            .origin
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .ok_or(BillingError::MissingOrigin)?;
        let env = self.environments.resolve(Some(origin))?;

        // 2. Reuse the provider's customer for this email, creating one
        //    only when none exists yet
        let customer = match env.provider.find_customer_by_email(&cmd.email).await? {
            Some(existing) => existing,
            None => {
                env.provider
                    .create_customer(CreateCustomerRequest {
                        email: cmd.email.clone(),
                        name: cmd.user_name.clone(),
                    })
                    .await?
            }
        };

        // 3. Create the discounted subscription up front; the client
        //    confirms its payment through the checkout session
        let subscription = env
            .provider
            .create_subscription(CreateSubscriptionRequest {
                customer_id: customer.id.clone(),
                price_id: cmd.price_id.clone(),
                promotion_id: Some(env.promotion_id.clone()),
            })
            .await?;

        // 4. Create the checkout session, correlated back to the
        //    subscription through client_reference_id
        let session = env
            .provider
            .create_checkout_session(CreateCheckoutSessionRequest {
                email: cmd.email.clone(),
                price_id: cmd.price_id.clone(),
                coupon_id: Some(env.coupon_id.clone()),
                client_reference_id: subscription.id.clone(),
                success_url: format!("{}/#/thanks", origin),
                cancel_url: format!("{}/#/paywall", origin),
            })
            .await?;

        // 5. Persist the pending record; replaces any earlier attempt
        //    for this email
        let record = EntitlementRecord {
            id: session.id.clone(),
            user_id: cmd.user_id,
            user_name: cmd.user_name,
            email: cmd.email,
            iq_value: cmd.iq_value,
            amount_total: session.amount_total,
            amount_subtotal: session.amount_subtotal,
            currency: session.currency,
            payment_method_types: session.payment_method_types,
            mode: session.mode,
            subscription_id: Some(subscription.id),
            customer_id: customer.id,
            status: EntitlementStatus::Pending,
            created_at: Utc::now(),
        };
        self.store.save(&record).await?;

        tracing::info!(
            session_id = %record.id,
            environment = env.environment.as_str(),
            "checkout session created"
        );

        Ok(CreateCheckoutResult {
            session_id: record.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEntitlementStore;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::StripeEnvironment;
    use crate::ports::{Customer, PaymentError};

    // ════════════════════════════════════════════════════════════════════════════
    // Test Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        production: Arc<MockPaymentProvider>,
        development: Arc<MockPaymentProvider>,
        store: Arc<InMemoryEntitlementStore>,
        handler: CreateCheckoutHandler,
    }

    fn fixture() -> Fixture {
        let production = Arc::new(MockPaymentProvider::new());
        let development = Arc::new(MockPaymentProvider::new());
        let store = Arc::new(InMemoryEntitlementStore::new());

        let environments = Arc::new(PaymentEnvironments::new(
            "iq-check140.com",
            crate::application::environments::PaymentEnvironment {
                environment: StripeEnvironment::Production,
                provider: production.clone(),
                promotion_id: "promo_live".to_string(),
                coupon_id: "coupon_live".to_string(),
                publishable_key: "pk_live_x".to_string(),
            },
            crate::application::environments::PaymentEnvironment {
                environment: StripeEnvironment::Development,
                provider: development.clone(),
                promotion_id: "promo_test".to_string(),
                coupon_id: "coupon_test".to_string(),
                publishable_key: "pk_test_x".to_string(),
            },
        ));
        let handler = CreateCheckoutHandler::new(environments, store.clone());

        Fixture {
            production,
            development,
            store,
            handler,
        }
    }

    fn command(origin: &str) -> CreateCheckoutCommand {
        CreateCheckoutCommand {
            origin: Some(origin.to_string()),
            user_id: "usr_1".to_string(),
            user_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            price_id: "price_1".to_string(),
            iq_value: Some("132".to_string()),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn creates_pending_record_with_offer_snapshot() {
        let f = fixture();
        let result = f.handler.handle(command("http://localhost:5173")).await.unwrap();

        let records = f.store.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, result.session_id);
        assert_eq!(record.status, EntitlementStatus::Pending);
        assert_eq!(record.email, "ada@example.com");
        assert_eq!(record.amount_total, Some(500));
        assert_eq!(record.mode, "subscription");
        assert!(record.subscription_id.is_some());
    }

    #[tokio::test]
    async fn reuses_existing_customer() {
        let f = fixture();
        f.development.add_customer(Customer {
            id: "cus_existing".to_string(),
            email: "ada@example.com".to_string(),
            name: Some("Ada".to_string()),
        });

        f.handler.handle(command("http://localhost:5173")).await.unwrap();

        assert_eq!(f.development.call_count("create_customer"), 0);
        assert_eq!(f.store.records()[0].customer_id, "cus_existing");
    }

    #[tokio::test]
    async fn creates_customer_when_none_exists() {
        let f = fixture();
        f.handler.handle(command("http://localhost:5173")).await.unwrap();

        assert_eq!(f.development.call_count("find_customer_by_email"), 1);
        assert_eq!(f.development.call_count("create_customer"), 1);
    }

    #[tokio::test]
    async fn routes_production_origin_to_production_account() {
        let f = fixture();
        f.handler
            .handle(command("https://iq-check140.com"))
            .await
            .unwrap();

        assert_eq!(f.production.call_count("create_checkout_session"), 1);
        assert_eq!(f.development.call_count("create_checkout_session"), 0);

        // The production promotion id is the one applied.
        let calls = f.production.calls();
        let sub_call = calls
            .iter()
            .find(|c| c.method == "create_subscription")
            .unwrap();
        assert!(sub_call.args.contains(&"promo_live".to_string()));
    }

    #[tokio::test]
    async fn redirect_urls_derive_from_origin() {
        let f = fixture();
        f.handler.handle(command("http://localhost:5173")).await.unwrap();

        let calls = f.development.calls();
        let session_call = calls
            .iter()
            .find(|c| c.method == "create_checkout_session")
            .unwrap();
        assert!(session_call
            .args
            .contains(&"http://localhost:5173/#/thanks".to_string()));
        assert!(session_call
            .args
            .contains(&"http://localhost:5173/#/paywall".to_string()));
    }

    #[tokio::test]
    async fn missing_origin_is_rejected_before_any_provider_call() {
        let f = fixture();
        let mut cmd = command("http://localhost:5173");
        cmd.origin = None;

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert_eq!(err, BillingError::MissingOrigin);
        assert!(f.development.calls().is_empty());
        assert!(f.store.records().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_leaves_no_record() {
        let f = fixture();
        f.development
            .fail_on("create_subscription", PaymentError::provider("no such price"));

        let err = f.handler.handle(command("http://localhost:5173")).await.unwrap_err();
        assert!(matches!(err, BillingError::Provider { .. }));
        assert!(f.store.records().is_empty());
    }

    #[tokio::test]
    async fn repeat_checkout_replaces_previous_record() {
        let f = fixture();
        let first = f.handler.handle(command("http://localhost:5173")).await.unwrap();
        let second = f.handler.handle(command("http://localhost:5173")).await.unwrap();

        assert_ne!(first.session_id, second.session_id);
        let records = f.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, second.session_id);
    }
}
