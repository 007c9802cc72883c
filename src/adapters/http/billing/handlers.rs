//! HTTP handlers for the billing endpoints.
//!
//! Connects Axum routes to the application layer command/query handlers.
//!
//! # Security
//!
//! Client-facing routes require the static bearer secret; a missing or
//! malformed `Authorization` header is 401, a wrong token 403. The
//! webhook route skips bearer auth because Stripe authenticates its
//! deliveries with the signature header instead.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequestParts, Json, State};
use axum::http::header::{AUTHORIZATION, ORIGIN};
use axum::http::{request::Parts, HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::environments::PaymentEnvironments;
use crate::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckEntitlementHandler,
    CheckEntitlementQuery, CreateCheckoutCommand, CreateCheckoutHandler,
    CreatePortalSessionCommand, CreatePortalSessionHandler, RecordPreCheckoutCommand,
    RecordPreCheckoutHandler, ReconcileWebhookCommand, ReconcileWebhookHandler,
};
use crate::config::AuthConfig;
use crate::domain::billing::BillingError;
use crate::ports::EntitlementStore;

use super::dto::{
    ApiKeyResponse, BeforeCheckoutRequest, CancelSubscriptionRequest, CancelSubscriptionResponse,
    CanceledSubscription, CheckSubscriptionRequest, CheckSubscriptionResponse,
    CreateCheckoutSessionRequest, CreateCheckoutSessionResponse, CreatePortalSessionRequest,
    CreatePortalSessionResponse, ErrorResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; everything inside is Arc-wrapped.
#[derive(Clone)]
pub struct BillingAppState {
    pub environments: Arc<PaymentEnvironments>,
    pub store: Arc<dyn EntitlementStore>,
    pub auth: Arc<AuthConfig>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn create_checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(self.environments.clone(), self.store.clone())
    }

    pub fn portal_session_handler(&self) -> CreatePortalSessionHandler {
        CreatePortalSessionHandler::new(self.environments.clone(), self.store.clone())
    }

    pub fn check_entitlement_handler(&self) -> CheckEntitlementHandler {
        CheckEntitlementHandler::new(self.store.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.environments.clone(), self.store.clone())
    }

    pub fn precheckout_handler(&self) -> RecordPreCheckoutHandler {
        RecordPreCheckoutHandler::new(self.store.clone())
    }

    pub fn reconcile_webhook_handler(&self) -> ReconcileWebhookHandler {
        ReconcileWebhookHandler::new(self.environments.clone(), self.store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Bearer Authentication
// ════════════════════════════════════════════════════════════════════════════════

/// Marker extractor enforcing the static bearer secret.
pub struct RequireBearerAuth;

/// Rejection for failed bearer authentication.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// No Authorization header present.
    Missing,
    /// Header present but not a Bearer token.
    Malformed,
    /// Token does not match the configured secret.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AuthRejection::Missing => (StatusCode::UNAUTHORIZED, "Authorization header required"),
            AuthRejection::Malformed => {
                (StatusCode::UNAUTHORIZED, "Authorization must be a Bearer token")
            }
            AuthRejection::Forbidden => (StatusCode::FORBIDDEN, "Invalid API token"),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

#[async_trait]
impl FromRequestParts<BillingAppState> for RequireBearerAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BillingAppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthRejection::Missing)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthRejection::Malformed)?;

        if !state.auth.token_matches(token) {
            return Err(AuthRejection::Forbidden);
        }

        Ok(RequireBearerAuth)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Mapping
// ════════════════════════════════════════════════════════════════════════════════

/// HTTP-facing wrapper for billing errors.
///
/// Provider and storage failures are logged server-side and returned as
/// an opaque 500; everything else carries its message.
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self.0 {
            BillingError::MissingOrigin => (StatusCode::BAD_REQUEST, self.0.to_string()),
            BillingError::NotFound { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            BillingError::InvalidSignature { .. } => (StatusCode::BAD_REQUEST, self.0.to_string()),
            BillingError::Provider { .. } | BillingError::Storage { .. } => {
                tracing::error!(error = %self.0, "internal error serving billing request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

fn origin_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /create-checkout-session - Orchestrate a new checkout
pub async fn create_checkout_session(
    State(state): State<BillingAppState>,
    _auth: RequireBearerAuth,
    headers: HeaderMap,
    Json(request): Json<CreateCheckoutSessionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.create_checkout_handler();
    let result = handler
        .handle(CreateCheckoutCommand {
            origin: origin_from(&headers),
            user_id: request.user_id,
            user_name: request.user_name,
            email: request.email,
            price_id: request.price_id,
            iq_value: request.iq_value,
        })
        .await?;

    Ok(Json(CreateCheckoutSessionResponse {
        id: result.session_id,
    }))
}

/// POST /create-billing-portal-session - Open the billing portal
pub async fn create_billing_portal_session(
    State(state): State<BillingAppState>,
    _auth: RequireBearerAuth,
    headers: HeaderMap,
    Json(request): Json<CreatePortalSessionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.portal_session_handler();
    let result = handler
        .handle(CreatePortalSessionCommand {
            origin: origin_from(&headers),
            email: request.email,
        })
        .await?;

    Ok(Json(CreatePortalSessionResponse { url: result.url }))
}

/// POST /check-subscription - Report an email's entitlement status
pub async fn check_subscription(
    State(state): State<BillingAppState>,
    _auth: RequireBearerAuth,
    Json(request): Json<CheckSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.check_entitlement_handler();
    let result = handler
        .handle(CheckEntitlementQuery {
            email: request.email,
        })
        .await?;

    Ok(Json(CheckSubscriptionResponse {
        has_subscription: result.has_subscription,
    }))
}

/// POST /cancel-subscription - Cancel the active subscription
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    _auth: RequireBearerAuth,
    headers: HeaderMap,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.cancel_subscription_handler();
    let result = handler
        .handle(CancelSubscriptionCommand {
            origin: origin_from(&headers),
            email: request.email,
        })
        .await?;

    Ok(Json(CancelSubscriptionResponse {
        success: true,
        subscription: CanceledSubscription {
            id: result.canceled.id,
            status: result.canceled.status,
        },
    }))
}

/// POST /before-checkout - Record checkout intent
pub async fn before_checkout(
    State(state): State<BillingAppState>,
    _auth: RequireBearerAuth,
    Json(request): Json<BeforeCheckoutRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.precheckout_handler();
    handler
        .handle(RecordPreCheckoutCommand {
            user_id: request.user_id,
            user_name: request.user_name,
            email: request.email,
            date: request.date,
            iq_value: request.iq_value,
        })
        .await?;

    // Plain-text 200, matching what the web client already accepts.
    Ok("OK")
}

/// POST /webhook - Reconcile a Stripe webhook delivery
///
/// Authenticated by the Stripe-Signature header, never by bearer token.
/// Once the signature verifies, the delivery is acknowledged regardless
/// of whether it could be applied.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BillingError::invalid_signature("Missing Stripe-Signature header"))?;

    let handler = state.reconcile_webhook_handler();
    handler
        .handle(ReconcileWebhookCommand {
            origin: origin_from(&headers),
            payload: body.to_vec(),
            signature: signature.to_string(),
        })
        .await?;

    Ok(Json(WebhookAckResponse { received: true }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /get-api-key - Publishable key for the caller's environment
///
/// Unauthenticated: the client needs this before anything else, and the
/// publishable key is public by design. A missing origin falls back to
/// the development key.
pub async fn get_api_key(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let origin = origin_from(&headers);
    let env = state.environments.resolve_or_dev(origin.as_deref());

    Json(ApiKeyResponse {
        api_key: env.publishable_key.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejections_map_to_expected_statuses() {
        assert_eq!(
            AuthRejection::Missing.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Malformed.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn billing_errors_map_to_expected_statuses() {
        let cases = [
            (BillingError::MissingOrigin, StatusCode::BAD_REQUEST),
            (
                BillingError::not_found("a@example.com"),
                StatusCode::NOT_FOUND,
            ),
            (
                BillingError::invalid_signature("bad hmac"),
                StatusCode::BAD_REQUEST,
            ),
            (
                BillingError::provider("stripe down"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                BillingError::storage("db down"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = BillingApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn origin_header_extraction() {
        let mut headers = HeaderMap::new();
        assert!(origin_from(&headers).is_none());

        headers.insert(ORIGIN, "http://localhost:5173".parse().unwrap());
        assert_eq!(
            origin_from(&headers).as_deref(),
            Some("http://localhost:5173")
        );
    }
}
