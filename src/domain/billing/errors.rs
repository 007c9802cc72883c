//! Billing error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | MissingOrigin | 400 |
//! | NotFound | 404 |
//! | InvalidSignature | 400 |
//! | Provider | 500 |
//! | Storage | 500 |

use thiserror::Error;

/// Errors from billing operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BillingError {
    /// Origin header absent where an environment must be resolved.
    #[error("Origin header is required to resolve the Stripe environment")]
    MissingOrigin,

    /// No entitlement record exists for the given email.
    #[error("No billing record found for {email}")]
    NotFound { email: String },

    /// Webhook signature verification failed.
    #[error("Webhook signature verification failed: {reason}")]
    InvalidSignature { reason: String },

    /// A Stripe call failed (transport error or provider rejection).
    #[error("Payment provider error: {message}")]
    Provider { message: String },

    /// The entitlement store failed.
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl BillingError {
    pub fn not_found(email: impl Into<String>) -> Self {
        BillingError::NotFound {
            email: email.into(),
        }
    }

    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        BillingError::InvalidSignature {
            reason: reason.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        BillingError::Provider {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        BillingError::Storage {
            message: message.into(),
        }
    }
}
