//! Ports: contracts between the application core and the outside world.

mod entitlement_store;
mod payment_provider;

pub use entitlement_store::EntitlementStore;
pub use payment_provider::{
    CheckoutSession, CreateCheckoutSessionRequest, CreateCustomerRequest,
    CreateSubscriptionRequest, Customer, PaymentError, PaymentErrorCode, PaymentProvider,
    PortalSession, Subscription, WebhookEvent, WebhookEventData, WebhookEventType,
};
