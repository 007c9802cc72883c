//! Stripe adapter: REST client, webhook verification, and a test mock.

mod mock_payment_provider;
mod stripe_adapter;
mod webhook_types;

pub use mock_payment_provider::MockPaymentProvider;
pub use stripe_adapter::{StripeAdapterConfig, StripePaymentAdapter};
pub use webhook_types::{hex_encode, SignatureHeader, SignatureParseError};
