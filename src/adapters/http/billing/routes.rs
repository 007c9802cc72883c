//! Axum router configuration for the billing endpoints.
//!
//! The route paths are the wire contract the web client already speaks;
//! they are mounted at the server root, not under an API prefix.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    before_checkout, cancel_subscription, check_subscription, create_billing_portal_session,
    create_checkout_session, get_api_key, handle_stripe_webhook, BillingAppState,
};

/// Create the billing API router.
///
/// # Routes
///
/// ## Client Endpoints (bearer auth)
/// - `POST /create-checkout-session` - Orchestrate a new checkout
/// - `POST /create-billing-portal-session` - Open the billing portal
/// - `POST /check-subscription` - Report entitlement status
/// - `POST /cancel-subscription` - Cancel the active subscription
/// - `POST /before-checkout` - Record checkout intent
///
/// ## Public Endpoints
/// - `GET /get-api-key` - Publishable key for the caller's environment
///
/// ## Webhook Endpoints (no bearer auth, signature verified)
/// - `POST /webhook` - Reconcile Stripe webhook deliveries
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        // Client endpoints
        .route("/create-checkout-session", post(create_checkout_session))
        .route(
            "/create-billing-portal-session",
            post(create_billing_portal_session),
        )
        .route("/check-subscription", post(check_subscription))
        .route("/cancel-subscription", post(cancel_subscription))
        .route("/before-checkout", post(before_checkout))
        // Public endpoints
        .route("/get-api-key", get(get_api_key))
        // Webhook endpoint
        .route("/webhook", post(handle_stripe_webhook))
}
