//! Mock payment provider for testing.
//!
//! Configurable implementation of `PaymentProvider` for unit and
//! integration tests. Supports:
//! - Pre-configured customers, sessions, and webhook events
//! - Error injection per method
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{
    CheckoutSession, CreateCheckoutSessionRequest, CreateCustomerRequest,
    CreateSubscriptionRequest, Customer, PaymentError, PaymentProvider, PortalSession,
    Subscription, WebhookEvent,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
///
/// // Configure responses
/// mock.add_customer(Customer { id: "cus_123".into(), ... });
///
/// // Inject errors
/// mock.fail_on("create_subscription", PaymentError::provider("no such price"));
///
/// // Use in tests
/// let result = mock.create_customer(request).await;
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Known customers by email.
    customers_by_email: HashMap<String, Customer>,

    /// Active subscriptions by customer id.
    active_subscriptions: HashMap<String, Vec<Subscription>>,

    /// Next checkout session to return.
    next_checkout: Option<CheckoutSession>,

    /// Next portal session to return.
    next_portal: Option<PortalSession>,

    /// Next webhook event to return from verification.
    next_webhook_event: Option<WebhookEvent>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    /// Reject all webhook verifications.
    reject_webhooks: bool,

    /// Sequence counter for generated ids.
    seq: u32,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails all webhook verifications.
    pub fn rejecting_webhooks() -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().reject_webhooks = true;
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Add a customer to the "database".
    pub fn add_customer(&self, customer: Customer) {
        let email = customer.email.clone();
        self.inner
            .lock()
            .unwrap()
            .customers_by_email
            .insert(email, customer);
    }

    /// Register an active subscription for a customer.
    pub fn add_active_subscription(&self, subscription: Subscription) {
        let customer_id = subscription.customer_id.clone();
        self.inner
            .lock()
            .unwrap()
            .active_subscriptions
            .entry(customer_id)
            .or_default()
            .push(subscription);
    }

    /// Set the checkout session to return.
    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.inner.lock().unwrap().next_checkout = Some(session);
    }

    /// Set the portal session to return.
    pub fn set_portal_session(&self, session: PortalSession) {
        self.inner.lock().unwrap().next_portal = Some(session);
    }

    /// Set the webhook event to return on verification.
    pub fn set_webhook_event(&self, event: WebhookEvent) {
        self.inner.lock().unwrap().next_webhook_event = Some(event);
    }

    /// Inject an error for a specific method.
    pub fn fail_on(&self, method: &str, error: PaymentError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertion Helpers
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Count calls to a specific method.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    fn begin_call(
        &self,
        method: &str,
        args: Vec<String>,
    ) -> Result<std::sync::MutexGuard<'_, MockState>, PaymentError> {
        let mut state = self.inner.lock().unwrap();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
        if let Some(err) = state.method_errors.remove(method) {
            return Err(err);
        }
        Ok(state)
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let mut state = self.begin_call("create_customer", vec![request.email.clone()])?;
        state.seq += 1;
        let customer = Customer {
            id: format!("cus_mock_{}", state.seq),
            email: request.email.clone(),
            name: Some(request.name),
        };
        state
            .customers_by_email
            .insert(request.email, customer.clone());
        Ok(customer)
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, PaymentError> {
        let state = self.begin_call("find_customer_by_email", vec![email.to_string()])?;
        Ok(state.customers_by_email.get(email).cloned())
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<Subscription, PaymentError> {
        let mut state = self.begin_call(
            "create_subscription",
            vec![
                request.customer_id.clone(),
                request.price_id.clone(),
                request.promotion_id.clone().unwrap_or_default(),
            ],
        )?;
        state.seq += 1;
        Ok(Subscription {
            id: format!("sub_mock_{}", state.seq),
            customer_id: request.customer_id,
            status: "incomplete".to_string(),
        })
    }

    async fn list_active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, PaymentError> {
        let state =
            self.begin_call("list_active_subscriptions", vec![customer_id.to_string()])?;
        Ok(state
            .active_subscriptions
            .get(customer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, PaymentError> {
        let mut state =
            self.begin_call("cancel_subscription", vec![subscription_id.to_string()])?;

        let mut customer_id = String::new();
        for subs in state.active_subscriptions.values_mut() {
            if let Some(pos) = subs.iter().position(|s| s.id == subscription_id) {
                customer_id = subs.remove(pos).customer_id;
                break;
            }
        }
        Ok(Subscription {
            id: subscription_id.to_string(),
            customer_id,
            status: "canceled".to_string(),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut state = self.begin_call(
            "create_checkout_session",
            vec![
                request.email,
                request.price_id,
                request.client_reference_id,
                request.success_url,
                request.cancel_url,
            ],
        )?;
        if let Some(session) = state.next_checkout.take() {
            return Ok(session);
        }
        state.seq += 1;
        Ok(CheckoutSession {
            id: format!("cs_mock_{}", state.seq),
            url: Some("https://checkout.mock/session".to_string()),
            amount_total: Some(500),
            amount_subtotal: Some(1000),
            currency: Some("usd".to_string()),
            payment_method_types: vec!["card".to_string()],
            mode: "subscription".to_string(),
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let mut state = self.begin_call(
            "create_portal_session",
            vec![customer_id.to_string(), return_url.to_string()],
        )?;
        if let Some(session) = state.next_portal.take() {
            return Ok(session);
        }
        state.seq += 1;
        Ok(PortalSession {
            id: format!("bps_mock_{}", state.seq),
            url: "https://portal.mock/session".to_string(),
        })
    }

    async fn verify_webhook(
        &self,
        _payload: &[u8],
        _signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let mut state = self.begin_call("verify_webhook", vec![])?;
        if state.reject_webhooks {
            return Err(PaymentError::invalid_webhook("signature rejected"));
        }
        state
            .next_webhook_event
            .take()
            .ok_or_else(|| PaymentError::invalid_webhook("no webhook event configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_customer_registers_for_lookup() {
        let mock = MockPaymentProvider::new();
        let customer = mock
            .create_customer(CreateCustomerRequest {
                email: "ada@example.com".to_string(),
                name: "Ada".to_string(),
            })
            .await
            .unwrap();

        let found = mock
            .find_customer_by_email("ada@example.com")
            .await
            .unwrap();
        assert_eq!(found.map(|c| c.id), Some(customer.id));
    }

    #[tokio::test]
    async fn injected_method_error_fires_once() {
        let mock = MockPaymentProvider::new();
        mock.fail_on("create_subscription", PaymentError::provider("no such price"));

        let request = CreateSubscriptionRequest {
            customer_id: "cus_1".to_string(),
            price_id: "price_1".to_string(),
            promotion_id: None,
        };
        assert!(mock.create_subscription(request.clone()).await.is_err());
        assert!(mock.create_subscription(request).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_removes_active_subscription() {
        let mock = MockPaymentProvider::new();
        mock.add_active_subscription(Subscription {
            id: "sub_1".to_string(),
            customer_id: "cus_1".to_string(),
            status: "active".to_string(),
        });

        let canceled = mock.cancel_subscription("sub_1").await.unwrap();
        assert_eq!(canceled.status, "canceled");
        assert!(mock
            .list_active_subscriptions("cus_1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn rejecting_webhooks_fails_verification() {
        let mock = MockPaymentProvider::rejecting_webhooks();
        let err = mock.verify_webhook(b"{}", "sig").await.unwrap_err();
        assert!(err.message.contains("rejected"));
    }
}
