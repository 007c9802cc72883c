//! Request and response DTOs for the billing API.
//!
//! Field names follow the wire contract the web client already speaks
//! (camelCase), independent of internal naming.

use serde::{Deserialize, Serialize};

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// POST /create-checkout-session request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutSessionRequest {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub price_id: String,
    #[serde(default)]
    pub iq_value: Option<String>,
}

/// POST /create-checkout-session response.
///
/// The client redirects to Stripe with this session id, so the field
/// stays `id` as the checkout library expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutSessionResponse {
    pub id: String,
}

/// POST /create-billing-portal-session request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePortalSessionRequest {
    pub email: String,
}

/// POST /create-billing-portal-session response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePortalSessionResponse {
    pub url: String,
}

/// POST /check-subscription request.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckSubscriptionRequest {
    pub email: String,
}

/// POST /check-subscription response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSubscriptionResponse {
    pub has_subscription: bool,
}

/// POST /cancel-subscription request.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub email: String,
}

/// POST /cancel-subscription response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelSubscriptionResponse {
    pub success: bool,
    pub subscription: CanceledSubscription,
}

/// Canceled subscription summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanceledSubscription {
    pub id: String,
    pub status: String,
}

/// POST /before-checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeforeCheckoutRequest {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub date: String,
    #[serde(default)]
    pub iq_value: Option<String>,
}

/// GET /get-api-key response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: String,
}

/// POST /webhook acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}
