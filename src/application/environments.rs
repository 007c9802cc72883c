//! Per-environment payment provider registry.
//!
//! Holds one provider instance per isolated Stripe environment together
//! with that environment's promotional identifiers, and routes each
//! request to the right one from its `Origin` header. Handlers never see
//! credentials; they resolve an environment and use what it carries.

use std::sync::Arc;

use crate::domain::billing::{
    resolve_environment, resolve_with_dev_fallback, BillingError, StripeEnvironment,
};
use crate::ports::PaymentProvider;

/// One isolated Stripe environment, ready to serve requests.
#[derive(Clone)]
pub struct PaymentEnvironment {
    /// Which account this is.
    pub environment: StripeEnvironment,

    /// Provider bound to this environment's credentials.
    pub provider: Arc<dyn PaymentProvider>,

    /// Promotion code id applied when creating subscriptions.
    pub promotion_id: String,

    /// Coupon id attached to checkout sessions.
    pub coupon_id: String,

    /// Publishable key handed to the client.
    pub publishable_key: String,
}

/// Registry of both environments plus the routing rule.
#[derive(Clone)]
pub struct PaymentEnvironments {
    production_host: String,
    production: PaymentEnvironment,
    development: PaymentEnvironment,
}

impl PaymentEnvironments {
    pub fn new(
        production_host: impl Into<String>,
        production: PaymentEnvironment,
        development: PaymentEnvironment,
    ) -> Self {
        Self {
            production_host: production_host.into(),
            production,
            development,
        }
    }

    /// Resolve the environment for a request that requires an origin.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::MissingOrigin`] when the origin is absent
    /// or empty; routing never silently defaults to production.
    pub fn resolve(&self, origin: Option<&str>) -> Result<&PaymentEnvironment, BillingError> {
        let environment = resolve_environment(origin, &self.production_host)?;
        Ok(self.get(environment))
    }

    /// Resolve with a development fallback, for callers that tolerate a
    /// missing origin (publishable-key lookup).
    pub fn resolve_or_dev(&self, origin: Option<&str>) -> &PaymentEnvironment {
        self.get(resolve_with_dev_fallback(origin, &self.production_host))
    }

    /// The production environment, for callers that route by signature
    /// rather than origin (webhook deliveries).
    pub fn production(&self) -> &PaymentEnvironment {
        &self.production
    }

    /// The development environment.
    pub fn development(&self) -> &PaymentEnvironment {
        &self.development
    }

    fn get(&self, environment: StripeEnvironment) -> &PaymentEnvironment {
        match environment {
            StripeEnvironment::Production => &self.production,
            StripeEnvironment::Development => &self.development,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockPaymentProvider;

    fn environment(env: StripeEnvironment, publishable_key: &str) -> PaymentEnvironment {
        PaymentEnvironment {
            environment: env,
            provider: Arc::new(MockPaymentProvider::new()),
            promotion_id: format!("promo_{}", env.as_str()),
            coupon_id: format!("coupon_{}", env.as_str()),
            publishable_key: publishable_key.to_string(),
        }
    }

    fn registry() -> PaymentEnvironments {
        PaymentEnvironments::new(
            "iq-check140.com",
            environment(StripeEnvironment::Production, "pk_live_x"),
            environment(StripeEnvironment::Development, "pk_test_x"),
        )
    }

    #[test]
    fn production_origin_gets_production_environment() {
        let envs = registry();
        let env = envs.resolve(Some("https://iq-check140.com")).unwrap();
        assert_eq!(env.environment, StripeEnvironment::Production);
        assert_eq!(env.publishable_key, "pk_live_x");
    }

    #[test]
    fn unknown_origin_gets_development_environment() {
        let envs = registry();
        let env = envs.resolve(Some("http://localhost:5173")).unwrap();
        assert_eq!(env.environment, StripeEnvironment::Development);
        assert_eq!(env.promotion_id, "promo_development");
    }

    #[test]
    fn missing_origin_is_rejected_by_resolve() {
        let envs = registry();
        assert!(matches!(
            envs.resolve(None),
            Err(BillingError::MissingOrigin)
        ));
    }

    #[test]
    fn missing_origin_falls_back_to_development() {
        let envs = registry();
        let env = envs.resolve_or_dev(None);
        assert_eq!(env.environment, StripeEnvironment::Development);
    }
}
