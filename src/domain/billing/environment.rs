//! Origin-based Stripe environment resolution.
//!
//! Requests carry an `Origin` header; an origin containing the configured
//! production hostname routes to the production Stripe account, anything
//! else routes to development. Resolution fails closed: when an origin is
//! required and absent, the request is rejected rather than silently
//! defaulting to production.

use serde::{Deserialize, Serialize};

use super::errors::BillingError;

/// Which of the two isolated Stripe environments a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripeEnvironment {
    Production,
    Development,
}

impl StripeEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            StripeEnvironment::Production => "production",
            StripeEnvironment::Development => "development",
        }
    }
}

/// Resolve the environment for a request that requires one.
///
/// # Errors
///
/// Returns [`BillingError::MissingOrigin`] when the origin is absent or
/// empty.
pub fn resolve_environment(
    origin: Option<&str>,
    production_host: &str,
) -> Result<StripeEnvironment, BillingError> {
    match origin {
        Some(origin) if !origin.trim().is_empty() => {
            Ok(environment_for_origin(origin, production_host))
        }
        _ => Err(BillingError::MissingOrigin),
    }
}

/// Resolve with a development fallback for endpoints that tolerate a
/// missing origin (publishable-key lookup).
pub fn resolve_with_dev_fallback(
    origin: Option<&str>,
    production_host: &str,
) -> StripeEnvironment {
    resolve_environment(origin, production_host).unwrap_or(StripeEnvironment::Development)
}

fn environment_for_origin(origin: &str, production_host: &str) -> StripeEnvironment {
    if origin.contains(production_host) {
        StripeEnvironment::Production
    } else {
        StripeEnvironment::Development
    }
}
