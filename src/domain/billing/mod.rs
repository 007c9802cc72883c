//! Billing domain: entitlement records, environment routing, errors.

mod entitlement;
mod environment;
mod errors;
mod note;

pub use entitlement::{EntitlementRecord, EntitlementStatus};
pub use environment::{resolve_environment, resolve_with_dev_fallback, StripeEnvironment};
pub use errors::BillingError;
pub use note::PreCheckoutNote;
