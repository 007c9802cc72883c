//! ReconcileWebhookHandler - Command handler for provider webhook reconciliation.

use std::sync::Arc;

use crate::application::environments::PaymentEnvironments;
use crate::domain::billing::BillingError;
use crate::ports::{
    EntitlementStore, PaymentError, PaymentErrorCode, WebhookEvent, WebhookEventData,
    WebhookEventType,
};

/// Command to reconcile a delivered webhook.
#[derive(Debug, Clone)]
pub struct ReconcileWebhookCommand {
    /// Origin hint for environment routing. Provider deliveries carry no
    /// origin; those are verified against each environment's signing
    /// secret in turn, production first.
    pub origin: Option<String>,

    /// Raw webhook payload, byte-exact as received.
    pub payload: Vec<u8>,

    /// Signature header value.
    pub signature: String,
}

/// Outcome of webhook reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A completed checkout was applied to its entitlement record.
    Completed { record_id: String },

    /// The event was understood but could not be joined to a record;
    /// logged and dropped.
    Dropped,

    /// Event type outside this service's vocabulary; acknowledged only.
    Acknowledged,
}

/// Handler reconciling provider webhooks against the entitlement store.
///
/// # Design
///
/// Signature verification is the only rejection point: once the payload
/// is authenticated, every internal failure — a payload that will never
/// parse included — is logged and acknowledged so the provider does not
/// retry deliveries this service cannot use. Completed checkouts are
/// joined to their record by customer email, and the event's correlation
/// token overwrites the stored subscription id.
pub struct ReconcileWebhookHandler {
    environments: Arc<PaymentEnvironments>,
    store: Arc<dyn EntitlementStore>,
}

impl ReconcileWebhookHandler {
    pub fn new(environments: Arc<PaymentEnvironments>, store: Arc<dyn EntitlementStore>) -> Self {
        Self {
            environments,
            store,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileWebhookCommand,
    ) -> Result<ReconcileOutcome, BillingError> {
        // The only fallible step from the caller's perspective.
        let event = match self.verify(&cmd).await {
            Ok(event) => event,
            Err(err) if err.code == PaymentErrorCode::UnusableEvent => {
                // Authenticated but unparseable; retrying cannot help.
                tracing::error!(error = %err, "verified webhook payload could not be parsed");
                return Ok(ReconcileOutcome::Dropped);
            }
            Err(err) => return Err(err.into()),
        };

        match &event.event_type {
            WebhookEventType::CheckoutSessionCompleted => {
                match self.apply_completed_checkout(&event).await {
                    Ok(outcome) => Ok(outcome),
                    Err(err) => {
                        // Verified event, internal failure: ack anyway.
                        tracing::error!(
                            event_id = %event.id,
                            error = %err,
                            "failed to apply completed checkout"
                        );
                        Ok(ReconcileOutcome::Dropped)
                    }
                }
            }
            WebhookEventType::Unknown(event_type) => {
                tracing::debug!(event_id = %event.id, event_type, "ignoring webhook event");
                Ok(ReconcileOutcome::Acknowledged)
            }
        }
    }

    /// Verify the delivery against the right environment's signing secret.
    ///
    /// A resolvable origin routes directly. Real provider deliveries carry
    /// no `Origin` header, so an unrouted delivery is tried against
    /// production first and development second; the signature itself
    /// decides which account sent the event.
    async fn verify(&self, cmd: &ReconcileWebhookCommand) -> Result<WebhookEvent, PaymentError> {
        if let Ok(env) = self.environments.resolve(cmd.origin.as_deref()) {
            return env.provider.verify_webhook(&cmd.payload, &cmd.signature).await;
        }

        let production = &self.environments.production().provider;
        match production.verify_webhook(&cmd.payload, &cmd.signature).await {
            Err(err) if err.code == PaymentErrorCode::InvalidWebhook => {
                self.environments
                    .development()
                    .provider
                    .verify_webhook(&cmd.payload, &cmd.signature)
                    .await
            }
            other => other,
        }
    }

    async fn apply_completed_checkout(
        &self,
        event: &WebhookEvent,
    ) -> Result<ReconcileOutcome, BillingError> {
        let (customer_email, client_reference_id, subscription_id) = match &event.data {
            WebhookEventData::Checkout {
                customer_email,
                client_reference_id,
                subscription_id,
                ..
            } => (customer_email, client_reference_id, subscription_id),
            WebhookEventData::Raw { .. } => {
                tracing::warn!(event_id = %event.id, "completed checkout carried no session data");
                return Ok(ReconcileOutcome::Dropped);
            }
        };

        let Some(email) = customer_email.as_deref().filter(|e| !e.is_empty()) else {
            tracing::warn!(event_id = %event.id, "completed checkout carried no customer email");
            return Ok(ReconcileOutcome::Dropped);
        };

        let Some(mut record) = self.store.find_by_email(email).await? else {
            tracing::warn!(
                event_id = %event.id,
                email,
                "no entitlement record for completed checkout"
            );
            return Ok(ReconcileOutcome::Dropped);
        };

        // Prefer the correlation token set at session creation, fall back
        // to the session's own subscription id.
        let Some(token) = client_reference_id
            .as_deref()
            .or(subscription_id.as_deref())
        else {
            tracing::warn!(event_id = %event.id, email, "completed checkout carried no subscription");
            return Ok(ReconcileOutcome::Dropped);
        };

        record.complete(token);
        self.store.update(&record).await?;

        tracing::info!(
            event_id = %event.id,
            record_id = %record.id,
            "entitlement completed"
        );
        Ok(ReconcileOutcome::Completed {
            record_id: record.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEntitlementStore;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::application::environments::PaymentEnvironment;
    use crate::domain::billing::{EntitlementRecord, EntitlementStatus, StripeEnvironment};
    use chrono::Utc;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    fn pending_record(email: &str) -> EntitlementRecord {
        EntitlementRecord {
            id: "cs_1".to_string(),
            user_id: "usr_1".to_string(),
            user_name: "Ada".to_string(),
            email: email.to_string(),
            iq_value: None,
            amount_total: Some(500),
            amount_subtotal: Some(1000),
            currency: Some("usd".to_string()),
            payment_method_types: vec!["card".to_string()],
            mode: "subscription".to_string(),
            subscription_id: Some("sub_provisional".to_string()),
            customer_id: "cus_1".to_string(),
            status: EntitlementStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn completed_event(email: Option<&str>, client_reference_id: Option<&str>) -> WebhookEvent {
        WebhookEvent {
            id: "evt_1".to_string(),
            event_type: WebhookEventType::CheckoutSessionCompleted,
            data: WebhookEventData::Checkout {
                session_id: "cs_1".to_string(),
                customer_email: email.map(String::from),
                client_reference_id: client_reference_id.map(String::from),
                customer_id: Some("cus_1".to_string()),
                subscription_id: Some("sub_from_session".to_string()),
            },
            created_at: Utc::now().timestamp(),
        }
    }

    fn setup_split(
        production: Arc<MockPaymentProvider>,
        development: Arc<MockPaymentProvider>,
    ) -> (Arc<InMemoryEntitlementStore>, ReconcileWebhookHandler) {
        let store = Arc::new(InMemoryEntitlementStore::new());
        let env = |e: StripeEnvironment, provider: Arc<MockPaymentProvider>| PaymentEnvironment {
            environment: e,
            provider,
            promotion_id: "promo_x".to_string(),
            coupon_id: "coupon_x".to_string(),
            publishable_key: "pk_test_x".to_string(),
        };
        let environments = Arc::new(PaymentEnvironments::new(
            "iq-check140.com",
            env(StripeEnvironment::Production, production),
            env(StripeEnvironment::Development, development),
        ));
        let handler = ReconcileWebhookHandler::new(environments, store.clone());
        (store, handler)
    }

    fn setup(
        provider: Arc<MockPaymentProvider>,
    ) -> (Arc<InMemoryEntitlementStore>, ReconcileWebhookHandler) {
        setup_split(provider.clone(), provider)
    }

    fn command() -> ReconcileWebhookCommand {
        ReconcileWebhookCommand {
            origin: None,
            payload: b"{}".to_vec(),
            signature: "t=1,v1=aa".to_string(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn completed_checkout_finalizes_pending_record() {
        let provider = Arc::new(MockPaymentProvider::new());
        let (store, handler) = setup(provider.clone());
        store.save(&pending_record("ada@example.com")).await.unwrap();
        provider.set_webhook_event(completed_event(Some("ada@example.com"), Some("sub_final")));

        let outcome = handler.handle(command()).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Completed {
                record_id: "cs_1".to_string()
            }
        );

        let record = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(record.is_completed());
        assert_eq!(record.subscription_id.as_deref(), Some("sub_final"));
    }

    #[tokio::test]
    async fn reapplying_same_event_is_idempotent() {
        let provider = Arc::new(MockPaymentProvider::new());
        let (store, handler) = setup(provider.clone());
        store.save(&pending_record("ada@example.com")).await.unwrap();

        provider.set_webhook_event(completed_event(Some("ada@example.com"), Some("sub_final")));
        handler.handle(command()).await.unwrap();
        let after_first = store.find_by_email("ada@example.com").await.unwrap().unwrap();

        provider.set_webhook_event(completed_event(Some("ada@example.com"), Some("sub_final")));
        let outcome = handler.handle(command()).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Completed { .. }));

        let after_second = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn invalid_signature_is_the_only_rejection() {
        let provider = Arc::new(MockPaymentProvider::rejecting_webhooks());
        let (_store, handler) = setup(provider);

        let err = handler.handle(command()).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidSignature { .. }));
    }

    #[tokio::test]
    async fn verified_but_unparseable_payload_is_dropped_not_rejected() {
        let provider = Arc::new(MockPaymentProvider::new());
        let (store, handler) = setup(provider.clone());
        store.save(&pending_record("ada@example.com")).await.unwrap();
        provider.fail_on(
            "verify_webhook",
            PaymentError::unusable_event("missing field `mode`"),
        );

        let outcome = handler.handle(command()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Dropped);

        let record = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(record.status, EntitlementStatus::Pending);
    }

    #[tokio::test]
    async fn unrouted_delivery_verifies_against_production_first() {
        let production = Arc::new(MockPaymentProvider::new());
        let development = Arc::new(MockPaymentProvider::new());
        let (store, handler) = setup_split(production.clone(), development.clone());
        store.save(&pending_record("ada@example.com")).await.unwrap();
        production.set_webhook_event(completed_event(Some("ada@example.com"), Some("sub_live")));

        let outcome = handler.handle(command()).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Completed { .. }));
        assert_eq!(development.call_count("verify_webhook"), 0);
    }

    #[tokio::test]
    async fn unrouted_delivery_falls_back_to_development_secret() {
        // The production secret does not verify this payload, so the
        // development environment gets its turn.
        let production = Arc::new(MockPaymentProvider::rejecting_webhooks());
        let development = Arc::new(MockPaymentProvider::new());
        let (store, handler) = setup_split(production.clone(), development.clone());
        store.save(&pending_record("ada@example.com")).await.unwrap();
        development.set_webhook_event(completed_event(Some("ada@example.com"), Some("sub_test")));

        let outcome = handler.handle(command()).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Completed { .. }));
        assert_eq!(production.call_count("verify_webhook"), 1);
    }

    #[tokio::test]
    async fn unknown_email_is_dropped_not_rejected() {
        let provider = Arc::new(MockPaymentProvider::new());
        let (store, handler) = setup(provider.clone());
        provider.set_webhook_event(completed_event(Some("stranger@example.com"), Some("sub_x")));

        let outcome = handler.handle(command()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Dropped);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn missing_email_is_dropped() {
        let provider = Arc::new(MockPaymentProvider::new());
        let (_store, handler) = setup(provider.clone());
        provider.set_webhook_event(completed_event(None, Some("sub_x")));

        let outcome = handler.handle(command()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Dropped);
    }

    #[tokio::test]
    async fn session_subscription_backfills_missing_correlation_token() {
        let provider = Arc::new(MockPaymentProvider::new());
        let (store, handler) = setup(provider.clone());
        store.save(&pending_record("ada@example.com")).await.unwrap();
        provider.set_webhook_event(completed_event(Some("ada@example.com"), None));

        handler.handle(command()).await.unwrap();

        let record = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(record.subscription_id.as_deref(), Some("sub_from_session"));
    }

    #[tokio::test]
    async fn irrelevant_event_types_are_acknowledged() {
        let provider = Arc::new(MockPaymentProvider::new());
        let (store, handler) = setup(provider.clone());
        store.save(&pending_record("ada@example.com")).await.unwrap();
        provider.set_webhook_event(WebhookEvent {
            id: "evt_2".to_string(),
            event_type: WebhookEventType::Unknown("invoice.paid".to_string()),
            data: WebhookEventData::Raw {
                json: "{}".to_string(),
            },
            created_at: Utc::now().timestamp(),
        });

        let outcome = handler.handle(command()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Acknowledged);

        // Untouched.
        let record = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(record.status, EntitlementStatus::Pending);
    }

    #[tokio::test]
    async fn storage_failure_after_verification_is_swallowed() {
        let provider = Arc::new(MockPaymentProvider::new());
        let (store, handler) = setup(provider.clone());
        provider.set_webhook_event(completed_event(Some("ada@example.com"), Some("sub_x")));
        store.fail_next(BillingError::storage("connection refused"));

        let outcome = handler.handle(command()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Dropped);
    }
}
