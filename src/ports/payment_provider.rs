//! Payment provider port for external payment processing.
//!
//! Defines the contract this service needs from Stripe (or a stand-in
//! during tests): customer lookup/creation, subscription lifecycle,
//! checkout/portal sessions, and webhook verification.
//!
//! # Design
//!
//! - **One instance per environment**: the production and development
//!   Stripe accounts each get their own provider instance; nothing in the
//!   port is environment-aware.
//! - **Non-retryable within a request**: both transport and rejection
//!   failures abort the current operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::BillingError;

/// Port for the remote payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer in the payment system.
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError>;

    /// Find an existing customer by email.
    ///
    /// Returns the first match, or `None` when no customer carries this
    /// email yet.
    async fn find_customer_by_email(&self, email: &str)
        -> Result<Option<Customer>, PaymentError>;

    /// Create a subscription for a customer.
    ///
    /// The subscription is created with incomplete payment behavior; the
    /// client confirms the payment out of band.
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<Subscription, PaymentError>;

    /// List a customer's active subscriptions.
    async fn list_active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, PaymentError>;

    /// Cancel a subscription immediately.
    async fn cancel_subscription(&self, subscription_id: &str)
        -> Result<Subscription, PaymentError>;

    /// Create a checkout session for payment completion.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Create a billing portal session for subscription management.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Errors
    ///
    /// Signature failures are `InvalidWebhook`. A payload that verifies
    /// but cannot be parsed is `UnusableEvent`, so callers can acknowledge
    /// the delivery instead of provoking retries of a payload that can
    /// never succeed.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Customer email address.
    pub email: String,

    /// Customer display name.
    pub name: String,
}

/// Customer in the payment system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer ID (cus_...).
    pub id: String,

    /// Customer email.
    pub email: String,

    /// Customer name.
    pub name: Option<String>,
}

/// Request to create a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Provider's customer ID.
    pub customer_id: String,

    /// Price to subscribe to.
    pub price_id: String,

    /// Promotion code id applied to the subscription.
    pub promotion_id: Option<String>,
}

/// Subscription in the payment system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Provider's subscription ID (sub_...).
    pub id: String,

    /// Provider's customer ID.
    pub customer_id: String,

    /// Provider-reported status (incomplete, active, canceled, ...).
    pub status: String,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    /// Customer email for pre-fill.
    pub email: String,

    /// Price to check out.
    pub price_id: String,

    /// Coupon id attached as a discount.
    pub coupon_id: Option<String>,

    /// Correlation token joining the later webhook back to this
    /// orchestration (the subscription id).
    pub client_reference_id: String,

    /// URL to redirect after successful checkout.
    pub success_url: String,

    /// URL to redirect after canceled checkout.
    pub cancel_url: String,
}

/// Checkout session returned by the provider.
///
/// Carries the priced-offer snapshot persisted on the entitlement record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID (cs_...).
    pub id: String,

    /// Hosted checkout URL.
    pub url: Option<String>,

    /// Total after discounts, in cents.
    pub amount_total: Option<i64>,

    /// Subtotal before discounts, in cents.
    pub amount_subtotal: Option<i64>,

    /// Currency (lowercase ISO code).
    pub currency: Option<String>,

    /// Payment method types offered by the session.
    pub payment_method_types: Vec<String>,

    /// Session mode.
    pub mode: String,
}

/// Portal session for subscription management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    /// Provider's session ID.
    pub id: String,

    /// URL for the customer to access the portal.
    pub url: String,
}

/// Webhook event from the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from the provider (evt_...).
    pub id: String,

    /// Event type.
    pub event_type: WebhookEventType,

    /// Event payload.
    pub data: WebhookEventData,

    /// When the event occurred (Unix timestamp).
    pub created_at: i64,
}

/// Webhook event types this service distinguishes.
///
/// Everything except completed checkouts is acknowledged and ignored, so
/// the vocabulary stays deliberately small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Checkout session completed successfully.
    CheckoutSessionCompleted,

    /// Any other event type, kept for logging.
    Unknown(String),
}

/// Webhook event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEventData {
    /// Completed checkout session data.
    #[serde(rename = "checkout")]
    Checkout {
        session_id: String,
        customer_email: Option<String>,
        /// Correlation token set at session creation time.
        client_reference_id: Option<String>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },

    /// Raw JSON for event types this service ignores.
    #[serde(rename = "raw")]
    Raw { json: String },
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a provider rejection error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    /// Create an invalid webhook error.
    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }

    /// Create an error for a verified webhook whose payload is unusable.
    pub fn unusable_event(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::UnusableEvent, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        match err.code {
            PaymentErrorCode::InvalidWebhook => BillingError::invalid_signature(err.message),
            _ => BillingError::provider(err.message),
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Provider rejected the request (4xx-equivalent).
    ProviderError,

    /// Invalid webhook signature.
    InvalidWebhook,

    /// Webhook signature verified, but the payload cannot be parsed.
    UnusableEvent,
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::UnusableEvent => "unusable_event",
        };
        write!(f, "{}", s)
    }
}
