//! Billing command and query handlers.

mod billing_portal;
mod cancel_subscription;
mod check_entitlement;
mod create_checkout;
mod record_precheckout;
mod reconcile_webhook;

pub use billing_portal::{
    CreatePortalSessionCommand, CreatePortalSessionHandler, CreatePortalSessionResult,
};
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use check_entitlement::{
    CheckEntitlementHandler, CheckEntitlementQuery, CheckEntitlementResult,
};
pub use create_checkout::{CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult};
pub use record_precheckout::{RecordPreCheckoutCommand, RecordPreCheckoutHandler};
pub use reconcile_webhook::{
    ReconcileOutcome, ReconcileWebhookCommand, ReconcileWebhookHandler,
};
